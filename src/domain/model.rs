use crate::utils::error::{EnrollmentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 擁有者（使用者）識別，必須為正整數
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct OwnerId(u64);

impl OwnerId {
    pub fn new(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(EnrollmentError::InvalidOwner { value });
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for OwnerId {
    type Error = EnrollmentError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OwnerId> for u64 {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type EnrollmentId = u64;
pub type AddressId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub owner_id: OwnerId,
    pub name: String,
    pub cpf: String,
    pub birthday: DateTime<Utc>,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub enrollment_id: EnrollmentId,
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 可由呼叫端寫入的報名欄位（不含擁有者與時間戳）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentFields {
    pub name: String,
    pub cpf: String,
    pub birthday: DateTime<Utc>,
    pub phone: String,
}

/// 可由呼叫端寫入的地址欄位。
///
/// `complement` 為 `None` 表示未提供：建立時存成空值，更新時保留原值。
/// `Some("")` 是有效值，更新時會覆寫。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressFields {
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

/// 郵遞區號目錄可推導出的地址片段
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressFragment {
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentWithAddresses {
    pub enrollment: Enrollment,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    pub id: AddressId,
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl From<Address> for AddressView {
    fn from(address: Address) -> Self {
        Self {
            id: address.id,
            postal_code: address.postal_code,
            street: address.street,
            number: address.number,
            complement: address.complement,
            neighborhood: address.neighborhood,
            city: address.city,
            state: address.state,
        }
    }
}

/// 對外的報名檢視，沒有地址時 `address` 欄位完全省略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub id: EnrollmentId,
    pub name: String,
    pub cpf: String,
    pub birthday: DateTime<Utc>,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressView>,
}

impl From<EnrollmentWithAddresses> for EnrollmentView {
    fn from(record: EnrollmentWithAddresses) -> Self {
        let EnrollmentWithAddresses {
            enrollment,
            addresses,
        } = record;

        Self {
            id: enrollment.id,
            name: enrollment.name,
            cpf: enrollment.cpf,
            birthday: enrollment.birthday,
            phone: enrollment.phone,
            address: addresses.into_iter().next().map(AddressView::from),
        }
    }
}

/// createOrUpdate 的輸入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentWithAddressPayload {
    pub owner_id: OwnerId,
    #[serde(flatten)]
    pub enrollment: EnrollmentFields,
    pub address: AddressFields,
}
