//! Domain layer - provider-neutral LLM types and errors

pub mod error;
pub mod llm;

pub use error::DomainError;
pub use llm::{
    CompletionResult, FinishReason, GenerationOptions, LlmProvider, LlmRequest,
    LlmRequestBuilder, LlmResponse, LlmStream, Message, MessageRole, ProviderConfig,
    ProviderKind, ProviderOverrides, StreamChunk, TextStream, Usage,
};
