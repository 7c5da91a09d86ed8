use std::fmt;

use sha2::{Digest, Sha256};

use super::ProviderKind;
use crate::domain::DomainError;

/// Fully resolved configuration for one provider client.
///
/// Immutable once built. Two configs with the same provider, API key and
/// effective base URL share a [`fingerprint`](ProviderConfig::fingerprint)
/// and therefore the same cached client, regardless of how they were
/// constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    provider: ProviderKind,
    api_key: String,
    base_url: Option<String>,
    default_model: String,
}

impl ProviderConfig {
    /// Fails when the API key is empty; a client without credentials is
    /// rejected here rather than on its first call.
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Result<Self, DomainError> {
        let api_key = api_key.into().trim().to_string();

        if api_key.is_empty() {
            return Err(DomainError::configuration(format!(
                "Missing API key for provider '{}'",
                provider
            )));
        }

        Ok(Self {
            provider,
            api_key,
            base_url: None,
            default_model: provider.default_model().to_string(),
        })
    }

    /// Blank values keep the vendor default
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, DomainError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();

        if base_url.is_empty() {
            self.base_url = None;
            return Ok(self);
        }

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DomainError::configuration(format!(
                "Invalid base URL for provider '{}': {}",
                self.provider, base_url
            )));
        }

        self.base_url = Some(base_url);
        Ok(self)
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.default_model = model.trim().to_string();
        }
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Explicit base URL override, if any
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Base URL the client will actually call
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Hex SHA-256 over provider, API key and effective base URL.
    /// The default model is not part of the identity.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.provider.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.api_key.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.effective_base_url().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Prefix of the fingerprint, safe to put in logs
    pub fn short_fingerprint(&self) -> String {
        self.fingerprint()[..12].to_string()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Per-call overrides layered over configured settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl ProviderOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.base_url.is_none() && self.model.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = ProviderConfig::new(ProviderKind::Tongyi, " ").unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
        assert!(err.to_string().contains("tongyi"));
    }

    #[test]
    fn test_identical_configs_share_fingerprint() {
        let a = ProviderConfig::new(ProviderKind::OpenAi, "sk-1")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/")
            .unwrap();
        let b = ProviderConfig::new(ProviderKind::OpenAi, String::from("sk-1"))
            .unwrap()
            .with_base_url("http://localhost:8080/v1")
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_default_base_url_matches_explicit_default() {
        let implicit = ProviderConfig::new(ProviderKind::Tongyi, "sk").unwrap();
        let explicit = ProviderConfig::new(ProviderKind::Tongyi, "sk")
            .unwrap()
            .with_base_url(ProviderKind::Tongyi.default_base_url())
            .unwrap();

        assert_eq!(implicit.fingerprint(), explicit.fingerprint());
    }

    #[test]
    fn test_fingerprint_differs_by_key_base_url_and_provider() {
        let base = ProviderConfig::new(ProviderKind::OpenAi, "sk-1").unwrap();
        let other_key = ProviderConfig::new(ProviderKind::OpenAi, "sk-2").unwrap();
        let other_url = base.clone().with_base_url("http://proxy.local/v1").unwrap();
        let other_provider = ProviderConfig::new(ProviderKind::Tongyi, "sk-1").unwrap();

        assert_ne!(base.fingerprint(), other_key.fingerprint());
        assert_ne!(base.fingerprint(), other_url.fingerprint());
        assert_ne!(base.fingerprint(), other_provider.fingerprint());
    }

    #[test]
    fn test_default_model_is_not_part_of_identity() {
        let a = ProviderConfig::new(ProviderKind::OpenAi, "sk").unwrap();
        let b = a.clone().with_default_model("gpt-4o");

        assert_eq!(b.default_model(), "gpt-4o");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ProviderConfig::new(ProviderKind::OpenAi, "sk")
            .unwrap()
            .with_base_url("localhost:8080")
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, "sk-secret")
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
