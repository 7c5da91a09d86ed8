//! Smart-TA LLM
//!
//! The LLM access layer of the smart teaching assistant:
//! - One client per vendor (Tongyi/DashScope, OpenAI-compatible) behind
//!   the [`LlmProvider`] trait, with plain and streaming generation
//! - A factory resolving case-insensitive provider names and aliases
//! - A registry caching clients by configuration and holding the default
//!   provider and model
//!
//! ```no_run
//! use smart_ta_llm::{GenerateRequest, Message, ProviderRegistry};
//!
//! # async fn run() -> Result<(), smart_ta_llm::DomainError> {
//! let registry = ProviderRegistry::from_env()?;
//! let text = registry
//!     .generate_llm_response(GenerateRequest::new(vec![Message::user("Hello")]))
//!     .await?
//!     .into_text()
//!     .await?;
//! # let _ = text;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    CompletionResult, DomainError, GenerationOptions, LlmProvider, Message, MessageRole,
    ProviderConfig, ProviderKind, ProviderOverrides, TextStream,
};
pub use infrastructure::llm::{
    GenerateRequest, LlmHandle, LlmProviderFactory, ProviderRegistry, generate_llm_response,
};
