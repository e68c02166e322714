use crate::domain::model::{
    Address, AddressFields, Enrollment, EnrollmentFields, EnrollmentId, EnrollmentWithAddresses,
    OwnerId,
};
use crate::domain::ports::{AddressRepository, EnrollmentRepository, Store, UnitOfWork};
use crate::utils::error::{EnrollmentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreState {
    last_enrollment_id: EnrollmentId,
    last_address_id: u64,
    enrollments: Vec<Enrollment>,
    addresses: Vec<Address>,
}

impl StoreState {
    fn find_by_owner_with_addresses(&self, owner_id: OwnerId) -> Option<EnrollmentWithAddresses> {
        let enrollment = self
            .enrollments
            .iter()
            .find(|e| e.owner_id == owner_id)?
            .clone();

        let mut addresses: Vec<Address> = self
            .addresses
            .iter()
            .filter(|a| a.enrollment_id == enrollment.id)
            .cloned()
            .collect();
        addresses.sort_by_key(|a| a.id);

        Some(EnrollmentWithAddresses {
            enrollment,
            addresses,
        })
    }

    fn upsert_enrollment(
        &mut self,
        owner_id: OwnerId,
        create: EnrollmentFields,
        update: EnrollmentFields,
    ) -> Enrollment {
        let now = Utc::now();

        if let Some(existing) = self.enrollments.iter_mut().find(|e| e.owner_id == owner_id) {
            existing.name = update.name;
            existing.cpf = update.cpf;
            existing.birthday = update.birthday;
            existing.phone = update.phone;
            existing.updated_at = now;
            return existing.clone();
        }

        self.last_enrollment_id += 1;
        let enrollment = Enrollment {
            id: self.last_enrollment_id,
            owner_id,
            name: create.name,
            cpf: create.cpf,
            birthday: create.birthday,
            phone: create.phone,
            created_at: now,
            updated_at: now,
        };
        self.enrollments.push(enrollment.clone());
        enrollment
    }

    fn upsert_address(
        &mut self,
        enrollment_id: EnrollmentId,
        create: AddressFields,
        update: AddressFields,
    ) -> Result<Address> {
        if !self.enrollments.iter().any(|e| e.id == enrollment_id) {
            return Err(EnrollmentError::storage(format!(
                "address references unknown enrollment {}",
                enrollment_id
            )));
        }

        let now = Utc::now();

        // 同一報名有多筆地址時只動 id 最小的那筆
        let first = self
            .addresses
            .iter_mut()
            .filter(|a| a.enrollment_id == enrollment_id)
            .min_by_key(|a| a.id);

        if let Some(existing) = first {
            existing.postal_code = update.postal_code;
            existing.street = update.street;
            existing.number = update.number;
            existing.neighborhood = update.neighborhood;
            existing.city = update.city;
            existing.state = update.state;
            if let Some(complement) = update.complement {
                existing.complement = Some(complement);
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        self.last_address_id += 1;
        let address = Address {
            id: self.last_address_id,
            enrollment_id,
            postal_code: create.postal_code,
            street: create.street,
            number: create.number,
            complement: create.complement,
            neighborhood: create.neighborhood,
            city: create.city,
            state: create.state,
            created_at: now,
            updated_at: now,
        };
        self.addresses.push(address.clone());
        Ok(address)
    }
}

/// 程序內的報名/地址儲存，可選擇以 JSON 快照持久化
#[derive(Debug, Clone)]
pub struct LocalStore {
    state: Arc<Mutex<StoreState>>,
    snapshot_path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            snapshot_path: None,
        }
    }

    /// 從快照檔載入；檔案不存在時從空狀態開始
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No snapshot at {}, starting empty", path.display());
                StoreState::default()
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened local store at {}", path.display());
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

#[async_trait]
impl EnrollmentRepository for LocalStore {
    async fn find_by_owner_with_addresses(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<EnrollmentWithAddresses>> {
        let state = self.state.lock().await;
        Ok(state.find_by_owner_with_addresses(owner_id))
    }

    async fn upsert_by_owner(
        &self,
        owner_id: OwnerId,
        create: EnrollmentFields,
        update: EnrollmentFields,
    ) -> Result<Enrollment> {
        let tx = self.begin().await?;
        let enrollment = tx.upsert_by_owner(owner_id, create, update).await?;
        tx.commit().await?;
        Ok(enrollment)
    }
}

#[async_trait]
impl Store for LocalStore {
    type Tx = LocalTransaction;

    async fn begin(&self) -> Result<LocalTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(LocalTransaction {
            guard,
            working: Mutex::new(working),
            snapshot_path: self.snapshot_path.clone(),
        })
    }
}

/// 持有儲存鎖的交易；寫入作用在工作副本上，commit 時才發佈
pub struct LocalTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: Mutex<StoreState>,
    snapshot_path: Option<PathBuf>,
}

#[async_trait]
impl EnrollmentRepository for LocalTransaction {
    async fn find_by_owner_with_addresses(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<EnrollmentWithAddresses>> {
        let working = self.working.lock().await;
        Ok(working.find_by_owner_with_addresses(owner_id))
    }

    async fn upsert_by_owner(
        &self,
        owner_id: OwnerId,
        create: EnrollmentFields,
        update: EnrollmentFields,
    ) -> Result<Enrollment> {
        let mut working = self.working.lock().await;
        Ok(working.upsert_enrollment(owner_id, create, update))
    }
}

#[async_trait]
impl AddressRepository for LocalTransaction {
    async fn upsert_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        create: AddressFields,
        update: AddressFields,
    ) -> Result<Address> {
        let mut working = self.working.lock().await;
        working.upsert_address(enrollment_id, create, update)
    }
}

#[async_trait]
impl UnitOfWork for LocalTransaction {
    async fn commit(self) -> Result<()> {
        let LocalTransaction {
            mut guard,
            working,
            snapshot_path,
        } = self;
        let working = working.into_inner();

        // 先寫快照，成功後才發佈到記憶體
        if let Some(path) = &snapshot_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let json = serde_json::to_vec_pretty(&working)?;
            // 寫入同目錄暫存檔再 rename，中途失敗不會留下半寫的快照
            let staging = staging_path(path);
            tokio::fs::write(&staging, json).await?;
            tokio::fs::rename(&staging, path).await?;
            tracing::debug!("Snapshot written to {}", path.display());
        }

        *guard = working;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
