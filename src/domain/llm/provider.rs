use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Debug;
use std::pin::Pin;

use super::response::StreamChunk;
use super::{GenerationOptions, LlmRequest, LlmResponse, Message, ProviderKind};
use crate::domain::DomainError;

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, DomainError>> + Send>>;

/// Stream of non-empty text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

/// Trait for LLM providers (Tongyi, OpenAI)
///
/// Implementations perform exactly one HTTP attempt per call. Failures are
/// returned as [`DomainError::Provider`]; retry policy belongs to the caller.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Send a streaming chat completion request
    async fn chat_stream(&self, model: &str, request: LlmRequest) -> Result<LlmStream, DomainError>;

    /// Which vendor this client talks to
    fn kind(&self) -> ProviderKind;

    /// Base URL requests are sent to
    fn base_url(&self) -> &str;

    /// Get the provider name
    fn provider_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// List well-known models for this provider
    fn available_models(&self) -> Vec<&'static str>;

    /// Run a conversation and return the assistant text
    async fn generate_response(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<String, DomainError> {
        let request = validated_request(messages, options)?;
        let response = self.chat(model, request).await?;
        Ok(response.into_content())
    }

    /// Run a conversation and yield the assistant text as it arrives.
    ///
    /// The stream is finite and cannot be restarted. Transport errors show up
    /// as an `Err` item where the next fragment would have been.
    async fn stream_response(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<TextStream, DomainError> {
        let request = validated_request(messages, options)?;
        let chunks = self.chat_stream(model, request).await?;
        Ok(text_deltas(chunks))
    }
}

fn validated_request(
    messages: Vec<Message>,
    options: GenerationOptions,
) -> Result<LlmRequest, DomainError> {
    if messages.is_empty() {
        return Err(DomainError::validation("Conversation has no messages"));
    }

    Ok(LlmRequest::new(messages).with_options(options))
}

/// Reduce a chunk stream to its non-empty text deltas
pub fn text_deltas(chunks: LlmStream) -> TextStream {
    let stream = chunks.filter_map(|result| async move {
        match result {
            Ok(chunk) => chunk.text().map(|text| Ok(text.to_string())),
            Err(e) => Some(Err(e)),
        }
    });

    Box::pin(stream)
}
