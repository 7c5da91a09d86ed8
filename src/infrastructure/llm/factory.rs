use std::sync::Arc;
use std::time::Duration;

use super::http_client::HttpClient;
use super::{OpenAiProvider, TongyiProvider};
use crate::config::LlmSettings;
use crate::domain::{DomainError, LlmProvider, ProviderConfig, ProviderKind, ProviderOverrides};

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create a provider by name, layering `overrides` over `settings`.
    ///
    /// Unknown names fail with [`DomainError::UnsupportedProvider`] and a
    /// missing API key with [`DomainError::Configuration`]; neither touches
    /// the network.
    pub fn create(
        provider_name: &str,
        overrides: &ProviderOverrides,
        settings: &LlmSettings,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let config = Self::resolve_config(provider_name, overrides, settings)?;
        Self::from_config(&config, settings.request_timeout())
    }

    /// Resolve the full configuration a call would use
    pub fn resolve_config(
        provider_name: &str,
        overrides: &ProviderOverrides,
        settings: &LlmSettings,
    ) -> Result<ProviderConfig, DomainError> {
        let kind = ProviderKind::parse(provider_name)?;
        let vendor = settings.vendor(kind);

        let api_key = overrides
            .api_key
            .clone()
            .or_else(|| vendor.api_key.clone())
            .unwrap_or_default();

        let model = overrides
            .model
            .clone()
            .unwrap_or_else(|| settings.model_for(kind));

        let mut config = ProviderConfig::new(kind, api_key)?
            .with_default_model(model);

        if let Some(base_url) = overrides.base_url.as_ref().or(vendor.base_url.as_ref()) {
            config = config.with_base_url(base_url.as_str())?;
        }

        Ok(config)
    }

    /// Create a provider from an already resolved configuration
    pub fn from_config(
        config: &ProviderConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let http_client = HttpClient::with_timeout(timeout)?;
        let base_url = config.effective_base_url();

        let provider: Arc<dyn LlmProvider> = match config.provider() {
            ProviderKind::Tongyi => Arc::new(TongyiProvider::with_base_url(
                http_client,
                config.api_key(),
                base_url,
            )),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::with_base_url(
                http_client,
                config.api_key(),
                base_url,
            )),
        };

        tracing::info!(
            provider = provider.provider_name(),
            base_url = provider.base_url(),
            fingerprint = %config.short_fingerprint(),
            "Created LLM provider"
        );

        Ok(provider)
    }

    /// Create a Tongyi provider directly
    pub fn create_tongyi(api_key: impl Into<String>) -> Arc<dyn LlmProvider> {
        Arc::new(TongyiProvider::new(HttpClient::new(), api_key))
    }

    /// Create an OpenAI provider directly
    pub fn create_openai(api_key: impl Into<String>) -> Arc<dyn LlmProvider> {
        Arc::new(OpenAiProvider::new(HttpClient::new(), api_key))
    }

    /// Create an OpenAI-compatible provider with custom base URL
    pub fn create_openai_with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Arc<dyn LlmProvider> {
        Arc::new(OpenAiProvider::with_base_url(
            HttpClient::new(),
            api_key,
            base_url,
        ))
    }
}
