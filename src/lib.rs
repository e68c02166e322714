pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliArgs, Command};

pub use adapters::LocalStore;
pub use config::AppConfig;
pub use core::{
    postal_code::{CanonicalPostalCodeFormat, PostalCode},
    resolver::{PostalCodeResolver, ResolverConfig},
    service::EnrollmentService,
};
pub use domain::model::{
    AddressFields, AddressFragment, EnrollmentFields, EnrollmentView,
    EnrollmentWithAddressPayload, OwnerId,
};
pub use utils::error::{EnrollmentError, NotFoundReason, Result};
