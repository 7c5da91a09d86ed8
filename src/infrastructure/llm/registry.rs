//! Provider Registry
//!
//! Holds the default provider/model selection and caches constructed
//! provider clients by configuration fingerprint.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::LlmProviderFactory;
use crate::config::{AppConfig, LlmSettings};
use crate::domain::{
    CompletionResult, DomainError, GenerationOptions, LlmProvider, Message, ProviderKind,
    ProviderOverrides, TextStream,
};

static GLOBAL: OnceCell<ProviderRegistry> = OnceCell::new();

/// Current default selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDefaults {
    pub provider: ProviderKind,
    pub model: String,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
}

/// What the registry knows about one supported vendor
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub kind: ProviderKind,
    pub aliases: &'static [&'static str],
    pub configured: bool,
    pub model: String,
}

/// A provider client bound to the model it should be called with
#[derive(Debug, Clone)]
pub struct LlmHandle {
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
}

impl LlmHandle {
    pub async fn generate(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<String, DomainError> {
        self.provider
            .generate_response(&self.model, messages, options)
            .await
    }

    pub async fn stream(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<TextStream, DomainError> {
        self.provider
            .stream_response(&self.model, messages, options)
            .await
    }
}

/// Arguments of a call-through generation
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub messages: Vec<Message>,
    /// Falls back to the default model when unset
    pub model: Option<String>,
    /// Falls back to the default provider when unset
    pub provider: Option<String>,
    pub stream: bool,
    pub options: GenerationOptions,
    pub overrides: ProviderOverrides,
}

impl GenerateRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn overrides(mut self, overrides: ProviderOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Registry of LLM provider clients.
///
/// Construct one and pass it to whatever needs LLM access, or use
/// [`ProviderRegistry::global`] for a process-wide instance built from the
/// environment. The cache is unbounded: provider configuration is set by
/// operators and only ever takes a handful of distinct values.
#[derive(Debug)]
pub struct ProviderRegistry {
    settings: LlmSettings,
    defaults: RwLock<RegistryDefaults>,
    cache: RwLock<HashMap<String, Arc<dyn LlmProvider>>>,
}

impl ProviderRegistry {
    pub fn new(settings: LlmSettings) -> Result<Self, DomainError> {
        let provider = ProviderKind::parse(&settings.default_provider)?;
        let model = settings.model_for(provider);

        info!(provider = %provider, model = %model, "LLM provider registry initialized");

        Ok(Self {
            settings,
            defaults: RwLock::new(RegistryDefaults { provider, model }),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Build from `config/*` files and environment variables
    pub fn from_env() -> Result<Self, DomainError> {
        let config = AppConfig::load()
            .map_err(|e| DomainError::configuration(e.to_string()))?;
        Self::new(config.llm)
    }

    /// Process-wide registry, initialized from the environment on first access
    pub fn global() -> Result<&'static ProviderRegistry, DomainError> {
        GLOBAL.get_or_try_init(Self::from_env)
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Get or create the provider client for the resolved configuration
    pub async fn get_llm(
        &self,
        provider_name: &str,
        overrides: &ProviderOverrides,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let config = LlmProviderFactory::resolve_config(provider_name, overrides, &self.settings)?;
        let fingerprint = config.fingerprint();

        {
            let cache = self.cache.read().await;
            if let Some(provider) = cache.get(&fingerprint) {
                debug!(
                    provider = provider.provider_name(),
                    fingerprint = &fingerprint[..12],
                    "Returning cached provider"
                );
                return Ok(provider.clone());
            }
        }

        // Re-check under the write lock so concurrent misses build one client
        let mut cache = self.cache.write().await;
        if let Some(provider) = cache.get(&fingerprint) {
            return Ok(provider.clone());
        }

        debug!(fingerprint = &fingerprint[..12], "Provider cache miss");

        let provider = LlmProviderFactory::from_config(&config, self.settings.request_timeout())?;
        cache.insert(fingerprint, provider.clone());

        Ok(provider)
    }

    /// Change the default provider and model for all later default lookups
    pub async fn set_default(
        &self,
        provider_name: &str,
        model: impl Into<String>,
    ) -> Result<RegistryDefaults, DomainError> {
        let provider = ProviderKind::parse(provider_name)?;
        let model = model.into().trim().to_string();

        if model.is_empty() {
            return Err(DomainError::validation("Default model must not be empty"));
        }

        let defaults = RegistryDefaults { provider, model };
        *self.defaults.write().await = defaults.clone();

        info!(
            provider = %defaults.provider,
            model = %defaults.model,
            "Default LLM provider changed"
        );

        Ok(defaults)
    }

    pub async fn defaults(&self) -> RegistryDefaults {
        self.defaults.read().await.clone()
    }

    /// The default provider's client, bound to the default model
    pub async fn get_default_llm(&self) -> Result<LlmHandle, DomainError> {
        let defaults = self.defaults().await;
        let provider = self
            .get_llm(defaults.provider.as_str(), &ProviderOverrides::new())
            .await?;

        Ok(LlmHandle {
            provider,
            model: defaults.model,
        })
    }

    /// Single entry point used by the rest of the application
    pub async fn generate_llm_response(
        &self,
        request: GenerateRequest,
    ) -> Result<CompletionResult, DomainError> {
        let handle = self.resolve_handle(&request).await?;
        let provider_name = handle.provider.provider_name();

        debug!(
            provider = provider_name,
            model = %handle.model,
            stream = request.stream,
            messages = request.messages.len(),
            "Generating LLM response"
        );

        let result = if request.stream {
            handle
                .stream(request.messages, request.options)
                .await
                .map(CompletionResult::Stream)
        } else {
            handle
                .generate(request.messages, request.options)
                .await
                .map(CompletionResult::Text)
        };

        result.inspect_err(|e| {
            warn!(provider = provider_name, model = %handle.model, error = %e, "LLM call failed");
        })
    }

    async fn resolve_handle(&self, request: &GenerateRequest) -> Result<LlmHandle, DomainError> {
        let defaults = self.defaults().await;

        let kind = match request.provider.as_deref() {
            Some(name) => ProviderKind::parse(name)?,
            None => defaults.provider,
        };

        let model = request
            .model
            .clone()
            .or_else(|| request.overrides.model.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                if kind == defaults.provider {
                    defaults.model.clone()
                } else {
                    self.settings.model_for(kind)
                }
            });

        let provider = self.get_llm(kind.as_str(), &request.overrides).await?;

        Ok(LlmHandle { provider, model })
    }

    pub async fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.cache.read().await.len(),
        }
    }

    /// Drop every cached client; later lookups construct fresh ones
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    pub fn supported_providers(&self) -> Vec<ProviderStatus> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| ProviderStatus {
                kind,
                aliases: kind.aliases(),
                configured: self.settings.vendor(kind).has_api_key(),
                model: self.settings.model_for(kind),
            })
            .collect()
    }
}

/// Call-through on the process-wide registry
pub async fn generate_llm_response(
    request: GenerateRequest,
) -> Result<CompletionResult, DomainError> {
    ProviderRegistry::global()?
        .generate_llm_response(request)
        .await
}
