use crate::core::postal_code::{CanonicalPostalCodeFormat, PostalCode};
use crate::domain::model::AddressFragment;
use crate::domain::ports::{PostalCodeFormat, PostalCodeLookup};
use crate::utils::error::{EnrollmentError, NotFoundReason, Result};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DIRECTORY_URL: &str = "https://viacep.com.br/ws";

/// 解析器的外部目錄設定，建構時注入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

impl ResolverConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_seconds: None,
            user_agent: None,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTORY_URL)
    }
}

/// 目錄回應欄位；同時接受 ViaCEP 原始名稱與英文名稱
#[derive(Debug, Deserialize)]
struct DirectoryAddress {
    #[serde(default, rename = "logradouro", alias = "street")]
    street: String,
    #[serde(default, rename = "complemento", alias = "complement")]
    complement: String,
    #[serde(default, rename = "bairro", alias = "neighborhood")]
    neighborhood: String,
    #[serde(default, rename = "localidade", alias = "locality")]
    locality: String,
    #[serde(default, rename = "uf", alias = "state")]
    state: String,
}

impl From<DirectoryAddress> for AddressFragment {
    fn from(address: DirectoryAddress) -> Self {
        Self {
            street: address.street,
            complement: address.complement,
            neighborhood: address.neighborhood,
            city: address.locality,
            state: address.state,
        }
    }
}

pub struct PostalCodeResolver {
    config: ResolverConfig,
    format: Arc<dyn PostalCodeFormat>,
    client: Client,
}

impl PostalCodeResolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        Self::with_format(config, Arc::new(CanonicalPostalCodeFormat))
    }

    pub fn with_format(config: ResolverConfig, format: Arc<dyn PostalCodeFormat>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().map_err(|e| EnrollmentError::ConfigError {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            config,
            format,
            client,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn lookup_url(&self, digits: &str) -> String {
        format!("{}/{}/json/", self.config.base_url.trim_end_matches('/'), digits)
    }

    /// 驗證並正規化後，向郵遞區號目錄查詢一次
    pub async fn resolve(&self, raw_code: &str) -> Result<AddressFragment> {
        let code = PostalCode::parse(raw_code, self.format.as_ref()).inspect_err(|e| {
            tracing::warn!("⚠️ Rejected postal code input: {}", e);
        })?;

        let url = self.lookup_url(code.digits());
        tracing::debug!("Looking up postal code {} at {}", code.canonical(), url);

        let unavailable = |detail: String| {
            tracing::warn!(
                "⚠️ Postal directory lookup for {} failed: {}",
                code.digits(),
                detail
            );
            EnrollmentError::not_found(NotFoundReason::DirectoryUnavailable { detail })
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        tracing::debug!("Postal directory response status: {}", status);
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let fragment = parse_directory_body(&body).ok_or_else(|| {
            tracing::warn!("⚠️ Postal code {} is unknown to the directory", code.digits());
            EnrollmentError::not_found(NotFoundReason::PostalCodeUnknown {
                code: code.digits().to_string(),
            })
        })?;

        tracing::debug!(
            "Resolved postal code {} to {}/{}",
            code.canonical(),
            fragment.city,
            fragment.state
        );
        Ok(fragment)
    }
}

#[async_trait::async_trait]
impl PostalCodeLookup for PostalCodeResolver {
    async fn resolve(&self, raw_code: &str) -> Result<AddressFragment> {
        PostalCodeResolver::resolve(self, raw_code).await
    }
}

/// 空白內容、非物件 JSON 或帶有 `erro` 標記時回傳 None
fn parse_directory_body(body: &str) -> Option<AddressFragment> {
    if body.trim().is_empty() {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    if object.get("erro").is_some_and(is_truthy) {
        return None;
    }

    serde_json::from_value::<DirectoryAddress>(value)
        .ok()
        .map(AddressFragment::from)
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}
