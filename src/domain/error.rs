use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unsupported provider: {name}")]
    UnsupportedProvider { name: String },

    #[error("Provider error: {provider} - {}", format_provider_message(*.status, .message))]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

fn format_provider_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP {}: {}", status, message),
        None => message.to_string(),
    }
}

impl DomainError {
    pub fn unsupported_provider(name: impl Into<String>) -> Self {
        Self::UnsupportedProvider { name: name.into() }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Vendor answered with a non-success status; `body` is the raw error body
    pub fn provider_status(
        provider: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: Some(status),
            message: body.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Re-tag a provider error raised by a shared component (e.g. the HTTP client)
    pub fn with_provider(self, name: &str) -> Self {
        match self {
            Self::Provider {
                status, message, ..
            } => Self::Provider {
                provider: name.to_string(),
                status,
                message,
            },
            other => other,
        }
    }

    /// HTTP status returned by the vendor, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}
