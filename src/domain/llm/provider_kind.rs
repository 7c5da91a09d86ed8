use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// The closed set of LLM vendors this layer can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Alibaba Tongyi Qianwen through the DashScope text-generation API
    Tongyi,
    /// OpenAI or any server speaking the OpenAI chat-completions protocol
    OpenAi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Tongyi, ProviderKind::OpenAi];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Tongyi => "tongyi",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Accepted spellings besides the canonical name
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Tongyi => &["qwen", "dashscope"],
            ProviderKind::OpenAi => &["open_ai", "open-ai"],
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Tongyi => "https://dashscope.aliyuncs.com/api/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Tongyi => "qwen-turbo",
            ProviderKind::OpenAi => "gpt-4o-mini",
        }
    }

    /// Case-insensitive lookup over canonical names and aliases
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        let normalized = name.trim().to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str() == normalized || kind.aliases().contains(&normalized.as_str())
            })
            .ok_or_else(|| DomainError::unsupported_provider(name))
    }
}

impl FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        for name in ["tongyi", "Tongyi", "TONGYI", " qwen ", "DashScope"] {
            let kind = ProviderKind::parse(name).unwrap();
            assert_eq!(kind, ProviderKind::Tongyi, "{name}");
        }

        for name in ["openai", "OpenAI", "OPENAI", "open_ai", "Open-AI"] {
            let kind = ProviderKind::parse(name).unwrap();
            assert_eq!(kind, ProviderKind::OpenAi, "{name}");
        }
    }

    #[test]
    fn test_parse_unknown_provider() {
        let err = ProviderKind::parse("unknown-vendor").unwrap_err();
        match err {
            DomainError::UnsupportedProvider { name } => assert_eq!(name, "unknown-vendor"),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!("".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }
}
