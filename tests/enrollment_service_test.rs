use chrono::{TimeZone, Utc};
use enrollment_address::domain::ports::EnrollmentRepository;
use enrollment_address::{
    AddressFields, EnrollmentFields, EnrollmentService, EnrollmentWithAddressPayload,
    LocalStore, NotFoundReason, OwnerId, PostalCodeResolver, ResolverConfig,
};
use httpmock::prelude::*;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn owner(id: u64) -> OwnerId {
    OwnerId::new(id).unwrap()
}

fn mock_directory(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/ws/01310930/json/");
        then.status(200).json_body(serde_json::json!({
            "logradouro": "Avenida Paulista",
            "complemento": "",
            "bairro": "Bela Vista",
            "localidade": "São Paulo",
            "uf": "SP"
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/ws/20040020/json/");
        then.status(200).json_body(serde_json::json!({
            "logradouro": "Avenida Rio Branco",
            "complemento": "",
            "bairro": "Centro",
            "localidade": "Rio de Janeiro",
            "uf": "RJ"
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/ws/99999999/json/");
        then.status(200).json_body(serde_json::json!({ "erro": "true" }));
    });
}

fn service_for(
    server: &MockServer,
    store: LocalStore,
) -> EnrollmentService<LocalStore, PostalCodeResolver> {
    let resolver = PostalCodeResolver::new(ResolverConfig::new(server.url("/ws"))).unwrap();
    EnrollmentService::new(store, resolver)
}

fn payload(owner_id: u64, name: &str, address: AddressFields) -> EnrollmentWithAddressPayload {
    EnrollmentWithAddressPayload {
        owner_id: owner(owner_id),
        enrollment: EnrollmentFields {
            name: name.to_string(),
            cpf: "12345678909".to_string(),
            birthday: Utc.with_ymd_and_hms(1990, 5, 17, 0, 0, 0).unwrap(),
            phone: "(11) 99999-0000".to_string(),
        },
        address,
    }
}

fn sao_paulo_address() -> AddressFields {
    AddressFields {
        postal_code: "01310-930".to_string(),
        street: "Avenida Paulista".to_string(),
        number: "1578".to_string(),
        complement: Some("conjunto 4".to_string()),
        neighborhood: "Bela Vista".to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
    }
}

fn rio_address() -> AddressFields {
    AddressFields {
        postal_code: "20040020".to_string(),
        street: "Avenida Rio Branco".to_string(),
        number: "1".to_string(),
        complement: None,
        neighborhood: "Centro".to_string(),
        city: "Rio de Janeiro".to_string(),
        state: "RJ".to_string(),
    }
}

#[tokio::test]
async fn test_get_without_enrollment_is_not_found() {
    let server = MockServer::start();
    let service = service_for(&server, LocalStore::in_memory());

    let error = assert_err!(service.get_one_with_address_by_owner(owner(1)).await);
    assert_eq!(
        error.not_found_reason(),
        Some(&NotFoundReason::EnrollmentAbsent { owner_id: 1 })
    );
}

#[tokio::test]
async fn test_get_without_address_omits_address_field() {
    let server = MockServer::start();
    let store = LocalStore::in_memory();
    let fields = payload(2, "Ana", sao_paulo_address()).enrollment;
    store
        .upsert_by_owner(owner(2), fields.clone(), fields)
        .await
        .unwrap();

    let service = service_for(&server, store);
    let view = assert_ok!(service.get_one_with_address_by_owner(owner(2)).await);

    assert!(view.address.is_none());
    let json = serde_json::to_value(&view).unwrap();
    assert!(json.get("address").is_none());
    assert!(json.get("ownerId").is_none());
    assert_eq!(json["name"], "Ana");
}

#[tokio::test]
async fn test_create_then_read_back() {
    let server = MockServer::start();
    mock_directory(&server);
    let service = service_for(&server, LocalStore::in_memory());

    assert_ok!(
        service
            .create_or_update_enrollment_with_address(payload(3, "Ana", sao_paulo_address()))
            .await
    );

    let view = assert_ok!(service.get_one_with_address_by_owner(owner(3)).await);
    let address = view.address.unwrap();
    assert_eq!(view.name, "Ana");
    assert_eq!(address.postal_code, "01310-930");
    assert_eq!(address.complement.as_deref(), Some("conjunto 4"));
}

#[tokio::test]
async fn test_second_upsert_wins_with_single_records() {
    let server = MockServer::start();
    mock_directory(&server);
    let service = service_for(&server, LocalStore::in_memory());

    assert_ok!(
        service
            .create_or_update_enrollment_with_address(payload(4, "Ana", sao_paulo_address()))
            .await
    );
    let first = service.get_one_with_address_by_owner(owner(4)).await.unwrap();

    assert_ok!(
        service
            .create_or_update_enrollment_with_address(payload(4, "Ana Maria", rio_address()))
            .await
    );

    let record = service
        .store()
        .find_by_owner_with_addresses(owner(4))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.addresses.len(), 1);
    assert_eq!(record.enrollment.id, first.id);
    assert_eq!(record.enrollment.name, "Ana Maria");
    assert_eq!(record.addresses[0].city, "Rio de Janeiro");
    assert_eq!(record.addresses[0].postal_code, "20040020");
    // 第二次未提供 complement，保留原值
    assert_eq!(record.addresses[0].complement.as_deref(), Some("conjunto 4"));
}

#[tokio::test]
async fn test_invalid_postal_code_leaves_existing_data_untouched() {
    let server = MockServer::start();
    mock_directory(&server);
    let service = service_for(&server, LocalStore::in_memory());

    assert_ok!(
        service
            .create_or_update_enrollment_with_address(payload(5, "Ana", sao_paulo_address()))
            .await
    );
    let before = service
        .store()
        .find_by_owner_with_addresses(owner(5))
        .await
        .unwrap();

    let mut malformed = rio_address();
    malformed.postal_code = "2004-0020".to_string();
    let error = assert_err!(
        service
            .create_or_update_enrollment_with_address(payload(5, "Changed", malformed))
            .await
    );
    assert!(error.is_not_found());

    let mut unknown = rio_address();
    unknown.postal_code = "99999-999".to_string();
    let error = assert_err!(
        service
            .create_or_update_enrollment_with_address(payload(5, "Changed", unknown))
            .await
    );
    assert!(error.is_not_found());

    let after = service
        .store()
        .find_by_owner_with_addresses(owner(5))
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_invalid_postal_code_creates_nothing_for_new_owner() {
    let server = MockServer::start();
    mock_directory(&server);
    let service = service_for(&server, LocalStore::in_memory());

    let mut unknown = rio_address();
    unknown.postal_code = "99999999".to_string();
    assert_err!(
        service
            .create_or_update_enrollment_with_address(payload(6, "Ana", unknown))
            .await
    );

    let error = assert_err!(service.get_one_with_address_by_owner(owner(6)).await);
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_blank_address_fields_are_enriched_from_directory() {
    let server = MockServer::start();
    mock_directory(&server);
    let service = service_for(&server, LocalStore::in_memory());

    let sparse = AddressFields {
        postal_code: "01310930".to_string(),
        number: "900".to_string(),
        ..Default::default()
    };
    assert_ok!(
        service
            .create_or_update_enrollment_with_address(payload(7, "Ana", sparse))
            .await
    );

    let address = service
        .get_one_with_address_by_owner(owner(7))
        .await
        .unwrap()
        .address
        .unwrap();
    assert_eq!(address.street, "Avenida Paulista");
    assert_eq!(address.city, "São Paulo");
    assert_eq!(address.state, "SP");
    assert_eq!(address.complement, None);
}

#[tokio::test]
async fn test_owners_are_independent() {
    let server = MockServer::start();
    mock_directory(&server);
    let service = service_for(&server, LocalStore::in_memory());

    let (a, b) = tokio::join!(
        service.create_or_update_enrollment_with_address(payload(8, "Ana", sao_paulo_address())),
        service.create_or_update_enrollment_with_address(payload(9, "Bia", rio_address())),
    );
    assert_ok!(a);
    assert_ok!(b);

    let ana = service.get_one_with_address_by_owner(owner(8)).await.unwrap();
    let bia = service.get_one_with_address_by_owner(owner(9)).await.unwrap();
    assert_ne!(ana.id, bia.id);
    assert_eq!(ana.address.unwrap().state, "SP");
    assert_eq!(bia.address.unwrap().state, "RJ");
}

#[tokio::test]
async fn test_persisted_upsert_survives_restart() {
    let server = MockServer::start();
    mock_directory(&server);
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("enrollments.json");

    let service = service_for(&server, LocalStore::open(&path).await.unwrap());
    assert_ok!(
        service
            .create_or_update_enrollment_with_address(payload(10, "Ana", rio_address()))
            .await
    );
    drop(service);

    let restarted = service_for(&server, LocalStore::open(&path).await.unwrap());
    let view = assert_ok!(restarted.get_one_with_address_by_owner(owner(10)).await);
    assert_eq!(view.address.unwrap().city, "Rio de Janeiro");
}
