use crate::domain::model::{
    AddressFields, AddressFragment, EnrollmentView, EnrollmentWithAddressPayload, OwnerId,
};
use crate::domain::ports::{
    AddressRepository, EnrollmentRepository, PostalCodeLookup, Store, UnitOfWork,
};
use crate::utils::error::{EnrollmentError, NotFoundReason, Result};

/// 協調報名與其唯一地址的讀取與 upsert
pub struct EnrollmentService<S: Store, L: PostalCodeLookup> {
    store: S,
    lookup: L,
}

impl<S: Store, L: PostalCodeLookup> EnrollmentService<S, L> {
    pub fn new(store: S, lookup: L) -> Self {
        Self { store, lookup }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn get_one_with_address_by_owner(&self, owner_id: OwnerId) -> Result<EnrollmentView> {
        let record = self
            .store
            .find_by_owner_with_addresses(owner_id)
            .await?
            .ok_or_else(|| {
                EnrollmentError::not_found(NotFoundReason::EnrollmentAbsent {
                    owner_id: owner_id.get(),
                })
            })?;

        tracing::debug!(
            "Enrollment {} for owner {} has {} address(es)",
            record.enrollment.id,
            owner_id,
            record.addresses.len()
        );
        Ok(EnrollmentView::from(record))
    }

    pub async fn create_or_update_enrollment_with_address(
        &self,
        payload: EnrollmentWithAddressPayload,
    ) -> Result<()> {
        let EnrollmentWithAddressPayload {
            owner_id,
            enrollment,
            address,
        } = payload;

        // 郵遞區號無效時不做任何寫入
        let fragment = self.lookup.resolve(&address.postal_code).await?;
        let address = address_for_upsert(address, &fragment);

        let tx = self.store.begin().await?;
        let saved = tx
            .upsert_by_owner(owner_id, enrollment.clone(), enrollment)
            .await?;
        let saved_address = tx
            .upsert_by_enrollment(saved.id, address.clone(), address)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "✅ Upserted enrollment {} (address {}) for owner {}",
            saved.id,
            saved_address.id,
            owner_id
        );
        Ok(())
    }

    pub async fn resolve_postal_code(&self, code: &str) -> Result<AddressFragment> {
        self.lookup.resolve(code).await
    }
}

/// 以呼叫端欄位為主，空白欄位才由目錄結果補上；complement 原樣保留
pub fn address_for_upsert(supplied: AddressFields, fragment: &AddressFragment) -> AddressFields {
    fn fill(value: String, fallback: &str) -> String {
        if value.trim().is_empty() && !fallback.is_empty() {
            fallback.to_string()
        } else {
            value
        }
    }

    AddressFields {
        postal_code: supplied.postal_code,
        street: fill(supplied.street, &fragment.street),
        number: supplied.number,
        // Some("") 也是有效值，不能以空字串判斷
        complement: supplied.complement,
        neighborhood: fill(supplied.neighborhood, &fragment.neighborhood),
        city: fill(supplied.city, &fragment.city),
        state: fill(supplied.state, &fragment.state),
    }
}
