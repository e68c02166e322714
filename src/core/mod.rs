pub mod postal_code;
pub mod resolver;
pub mod service;

pub use crate::domain::model::{AddressFragment, EnrollmentView, EnrollmentWithAddressPayload};
pub use crate::domain::ports::{PostalCodeFormat, PostalCodeLookup, Store};
pub use crate::utils::error::Result;
