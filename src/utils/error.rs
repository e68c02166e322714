use std::fmt;
use thiserror::Error;

/// NotFound 的診斷原因，呼叫端只需判斷 `is_not_found()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    MalformedPostalCode { input: String },
    PostalCodeUnknown { code: String },
    DirectoryUnavailable { detail: String },
    EnrollmentAbsent { owner_id: u64 },
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPostalCode { input } => write!(f, "malformed postal code '{}'", input),
            Self::PostalCodeUnknown { code } => write!(f, "postal code {} is unknown", code),
            Self::DirectoryUnavailable { detail } => {
                write!(f, "postal directory lookup failed: {}", detail)
            }
            Self::EnrollmentAbsent { owner_id } => {
                write!(f, "no enrollment for owner {}", owner_id)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("Not found: {reason}")]
    NotFound { reason: NotFoundReason },

    #[error("Invalid owner id: {value}")]
    InvalidOwner { value: u64 },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },
}

impl EnrollmentError {
    pub fn not_found(reason: NotFoundReason) -> Self {
        Self::NotFound { reason }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn not_found_reason(&self) -> Option<&NotFoundReason> {
        match self {
            Self::NotFound { reason } => Some(reason),
            _ => None,
        }
    }

    /// 給終端使用者看的訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "Requested resource could not be found".to_string(),
            Self::InvalidOwner { value } => format!("'{}' is not a valid owner id", value),
            Self::Storage { .. } | Self::IoError(_) | Self::SerializationError(_) => {
                "Enrollment data could not be read or written".to_string()
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Configuration problem: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::NotFound {
                reason: NotFoundReason::MalformedPostalCode { .. },
            } => "Use a postal code formatted as 12345-678 or 12345678".to_string(),
            Self::NotFound {
                reason: NotFoundReason::PostalCodeUnknown { .. },
            } => "Check the postal code against the postal directory".to_string(),
            Self::NotFound {
                reason: NotFoundReason::DirectoryUnavailable { .. },
            } => "Check network access and the directory base_url setting".to_string(),
            Self::NotFound {
                reason: NotFoundReason::EnrollmentAbsent { .. },
            } => "Create the enrollment with the 'upsert' command first".to_string(),
            Self::InvalidOwner { .. } => "Owner ids are positive integers".to_string(),
            Self::Storage { .. } | Self::IoError(_) | Self::SerializationError(_) => {
                "Check that the data path is writable and holds a valid snapshot".to_string()
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                "Review the TOML configuration file and command line overrides".to_string()
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 4,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidOwner { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrollmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_kind_is_shared_by_all_reasons() {
        let errors = [
            EnrollmentError::not_found(NotFoundReason::MalformedPostalCode {
                input: "123".to_string(),
            }),
            EnrollmentError::not_found(NotFoundReason::PostalCodeUnknown {
                code: "99999999".to_string(),
            }),
            EnrollmentError::not_found(NotFoundReason::EnrollmentAbsent { owner_id: 7 }),
        ];

        for error in &errors {
            assert!(error.is_not_found());
            assert_eq!(error.exit_code(), 4);
            assert_eq!(error.user_friendly_message(), "Requested resource could not be found");
        }
    }

    #[test]
    fn test_storage_error_is_not_not_found() {
        let error = EnrollmentError::storage("unique constraint");
        assert!(!error.is_not_found());
        assert!(error.not_found_reason().is_none());
        assert_eq!(error.exit_code(), 1);
    }
}
