//! LLM provider domain models and traits

mod config;
mod message;
mod provider;
mod provider_kind;
mod request;
mod response;

pub use config::{ProviderConfig, ProviderOverrides};
pub use message::{Message, MessageRole};
pub use provider::{LlmProvider, LlmStream, TextStream, text_deltas};
pub use provider_kind::ProviderKind;
pub use request::{GenerationOptions, LlmRequest, LlmRequestBuilder};
pub use response::{CompletionResult, FinishReason, LlmResponse, StreamChunk, Usage};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
