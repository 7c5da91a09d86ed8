use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::ProviderKind;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// LLM provider settings: the default selection plus per-vendor credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub default_provider: String,
    pub default_model: Option<String>,
    pub request_timeout_secs: u64,
    pub tongyi: VendorSettings,
    pub openai: VendorSettings,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct VendorSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderKind::Tongyi.as_str().to_string(),
            default_model: None,
            request_timeout_secs: 120,
            tongyi: VendorSettings::default(),
            openai: VendorSettings::default(),
        }
    }
}

impl LlmSettings {
    pub fn vendor(&self, kind: ProviderKind) -> &VendorSettings {
        match kind {
            ProviderKind::Tongyi => &self.tongyi,
            ProviderKind::OpenAi => &self.openai,
        }
    }

    pub fn vendor_mut(&mut self, kind: ProviderKind) -> &mut VendorSettings {
        match kind {
            ProviderKind::Tongyi => &mut self.tongyi,
            ProviderKind::OpenAi => &mut self.openai,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Model used when a caller does not name one: the configured default
    /// when `kind` is the default provider, else the vendor's own default
    pub fn model_for(&self, kind: ProviderKind) -> String {
        let is_default = ProviderKind::parse(&self.default_provider).ok() == Some(kind);

        is_default
            .then(|| self.default_model.clone())
            .flatten()
            .or_else(|| self.vendor(kind).model.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| kind.default_model().to_string())
    }
}

impl VendorSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for VendorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Conventional environment variables and the config keys they override.
/// Earlier names win when several map to the same key.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LLM_PROVIDER", "llm.default_provider"),
    ("LLM_MODEL", "llm.default_model"),
    ("DASHSCOPE_API_KEY", "llm.tongyi.api_key"),
    ("TONGYI_API_KEY", "llm.tongyi.api_key"),
    ("DASHSCOPE_BASE_URL", "llm.tongyi.base_url"),
    ("TONGYI_MODEL", "llm.tongyi.model"),
    ("OPENAI_API_KEY", "llm.openai.api_key"),
    ("OPENAI_BASE_URL", "llm.openai.base_url"),
    ("OPENAI_MODEL", "llm.openai.model"),
];

const TIMEOUT_VAR: &str = "LLM_REQUEST_TIMEOUT_SECS";
const TIMEOUT_KEY: &str = "llm.request_timeout_secs";

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_env(|name| std::env::var(name).ok())
    }

    /// Load with a custom lookup for the conventional variables
    pub fn load_with_env<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut applied: Vec<&str> = Vec::new();

        for (var, key) in ENV_OVERRIDES {
            if applied.contains(key) {
                continue;
            }

            let value = lookup(var).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                applied.push(key);
            }
            builder = builder.set_override_option(*key, value)?;
        }

        let timeout = lookup(TIMEOUT_VAR).map(|v| parse_timeout(&v)).transpose()?;
        builder = builder.set_override_option(TIMEOUT_KEY, timeout)?;

        builder.build()?.try_deserialize()
    }
}

fn parse_timeout(value: &str) -> Result<i64, config::ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(secs) => Ok(i64::from(secs)),
        Err(e) => {
            let message = format!("{} must be a number of seconds: {}", TIMEOUT_VAR, e);
            Err(config::ConfigError::Message(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::load_with_env(lookup(&[])).unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.llm.default_provider, "tongyi");
        assert_eq!(config.llm.request_timeout_secs, 120);
        assert!(!config.llm.tongyi.has_api_key());
        assert_eq!(config.llm.model_for(ProviderKind::Tongyi), "qwen-turbo");
    }

    #[test]
    fn test_conventional_variables_override() {
        let config = AppConfig::load_with_env(lookup(&[
            ("LLM_PROVIDER", "openai"),
            ("LLM_MODEL", "gpt-4o"),
            ("DASHSCOPE_API_KEY", "sk-dash"),
            ("OPENAI_API_KEY", "sk-open"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
            ("LLM_REQUEST_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.llm.default_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.llm.tongyi.api_key.as_deref(), Some("sk-dash"));
        assert_eq!(config.llm.openai.api_key.as_deref(), Some("sk-open"));
        assert_eq!(
            config.llm.openai.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.llm.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_dashscope_key_wins_over_tongyi_alias() {
        let config = AppConfig::load_with_env(lookup(&[
            ("TONGYI_API_KEY", "sk-alias"),
            ("DASHSCOPE_API_KEY", "sk-primary"),
        ]))
        .unwrap();
        assert_eq!(config.llm.tongyi.api_key.as_deref(), Some("sk-primary"));

        let vars = [("TONGYI_API_KEY", "sk-alias")];
        let config = AppConfig::load_with_env(lookup(&vars)).unwrap();
        assert_eq!(config.llm.tongyi.api_key.as_deref(), Some("sk-alias"));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let result = AppConfig::load_with_env(lookup(&[("LLM_REQUEST_TIMEOUT_SECS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_model_for_prefers_default_model_only_for_default_provider() {
        let mut settings = LlmSettings {
            default_provider: "Tongyi".to_string(),
            default_model: Some("qwen-max".to_string()),
            ..LlmSettings::default()
        };
        settings.openai.model = Some("gpt-4o".to_string());

        assert_eq!(settings.model_for(ProviderKind::Tongyi), "qwen-max");
        assert_eq!(settings.model_for(ProviderKind::OpenAi), "gpt-4o");

        settings.vendor_mut(ProviderKind::OpenAi).model = None;
        assert_eq!(settings.model_for(ProviderKind::OpenAi), "gpt-4o-mini");
    }

    #[test]
    fn test_vendor_settings_debug_redacts_key() {
        let settings = VendorSettings {
            api_key: Some("sk-secret".to_string()),
            ..VendorSettings::default()
        };
        assert!(!format!("{:?}", settings).contains("sk-secret"));
    }
}
