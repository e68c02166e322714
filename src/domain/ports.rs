use crate::domain::model::{
    Address, AddressFields, AddressFragment, Enrollment, EnrollmentFields, EnrollmentId,
    EnrollmentWithAddresses, OwnerId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// 依擁有者取得報名及其所有地址
    async fn find_by_owner_with_addresses(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<EnrollmentWithAddresses>>;

    /// 不存在則以 `create` 建立，否則以 `update` 更新；擁有者建立後不可變
    async fn upsert_by_owner(
        &self,
        owner_id: OwnerId,
        create: EnrollmentFields,
        update: EnrollmentFields,
    ) -> Result<Enrollment>;
}

#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// 只作用於該報名的第一筆地址
    async fn upsert_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        create: AddressFields,
        update: AddressFields,
    ) -> Result<Address>;
}

/// 單一交易範圍；未 commit 即 drop 會捨棄所有寫入
#[async_trait]
pub trait UnitOfWork: EnrollmentRepository + AddressRepository {
    async fn commit(self) -> Result<()>;
}

#[async_trait]
pub trait Store: EnrollmentRepository {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx>;
}

/// 標準 9 字元郵遞區號 (`#####-###`) 的格式規則
pub trait PostalCodeFormat: Send + Sync {
    fn check(&self, canonical: &str) -> std::result::Result<(), String>;
}

#[async_trait]
pub trait PostalCodeLookup: Send + Sync {
    async fn resolve(&self, raw_code: &str) -> Result<AddressFragment>;
}
