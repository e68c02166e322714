use crate::domain::ports::PostalCodeFormat;
use crate::utils::error::{EnrollmentError, NotFoundReason, Result};
use regex::Regex;
use std::sync::LazyLock;

static CANONICAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}-[0-9]{3}$").expect("valid postal code pattern"));

/// 預設格式規則：五位數字、連字號、三位數字
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalPostalCodeFormat;

impl PostalCodeFormat for CanonicalPostalCodeFormat {
    fn check(&self, canonical: &str) -> std::result::Result<(), String> {
        if CANONICAL_PATTERN.is_match(canonical) {
            Ok(())
        } else {
            Err(format!("'{}' does not match #####-###", canonical))
        }
    }
}

/// 通過驗證的郵遞區號：顯示用的 `#####-###` 與查詢用的 8 位數字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalCode {
    canonical: String,
    digits: String,
}

impl PostalCode {
    pub fn parse(raw: &str, format: &dyn PostalCodeFormat) -> Result<Self> {
        let malformed = || {
            EnrollmentError::not_found(NotFoundReason::MalformedPostalCode {
                input: raw.to_string(),
            })
        };

        // 只接受 ASCII，之後長度以位元組計算即等於字元數
        if !raw.is_ascii() {
            return Err(malformed());
        }

        let length = raw.len();
        if !(8..=9).contains(&length) {
            return Err(malformed());
        }

        // 8 字元輸入在第 5 個字元後補上連字號
        let canonical = if length == 8 {
            format!("{}-{}", &raw[..5], &raw[5..])
        } else {
            raw.to_string()
        };

        // 格式錯誤延後到數字檢查時一起回報
        let format_result = format.check(&canonical);

        let digits: String = raw.chars().filter(|c| *c != '-').collect();
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if let Err(detail) = format_result {
            tracing::debug!("Postal code format rule rejected input: {}", detail);
            return Err(malformed());
        }

        Ok(Self { canonical, digits })
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }
}
