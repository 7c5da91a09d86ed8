use std::fmt;

use serde::{Deserialize, Serialize};

use super::Message;
use super::provider::TextStream;

/// Reason why the generation finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
}

impl FinishReason {
    /// Map a vendor finish reason string. Returns `None` for the "still
    /// generating" markers some vendors send mid-stream.
    pub fn from_vendor(reason: &str) -> Option<Self> {
        match reason {
            "" | "null" => None,
            "stop" => Some(FinishReason::Stop),
            "length" => Some(FinishReason::Length),
            "content_filter" => Some(FinishReason::ContentFilter),
            "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
            _ => Some(FinishReason::Stop),
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub id: String,
    pub model: String,
    pub message: Message,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl LlmResponse {
    pub fn new(id: String, model: String, message: Message) -> Self {
        Self {
            id,
            model,
            message,
            finish_reason: None,
            usage: None,
        }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn content(&self) -> &str {
        self.message.content_text()
    }

    pub fn into_content(self) -> String {
        self.message.content
    }
}

/// Streaming chunk from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub id: String,
    pub model: String,
    pub delta: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl StreamChunk {
    pub fn new(id: String, model: String) -> Self {
        Self {
            id,
            model,
            delta: None,
            finish_reason: None,
            usage: None,
        }
    }

    pub fn with_delta(mut self, delta: impl Into<String>) -> Self {
        self.delta = Some(delta.into());
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Delta text, if this chunk carries any non-empty text
    pub fn text(&self) -> Option<&str> {
        self.delta.as_deref().filter(|d| !d.is_empty())
    }
}

/// Result of a call-through generation: full text, or a lazy stream of deltas
pub enum CompletionResult {
    Text(String),
    Stream(TextStream),
}

impl CompletionResult {
    pub fn is_stream(&self) -> bool {
        matches!(self, CompletionResult::Stream(_))
    }

    /// Collapse either form into the full text, draining the stream if needed
    pub async fn into_text(self) -> Result<String, crate::domain::DomainError> {
        use futures::TryStreamExt;

        match self {
            CompletionResult::Text(text) => Ok(text),
            CompletionResult::Stream(stream) => {
                let parts: Vec<String> = stream.try_collect().await?;
                Ok(parts.concat())
            }
        }
    }
}

impl fmt::Debug for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionResult::Text(text) => f.debug_tuple("Text").field(text).finish(),
            CompletionResult::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_calculation() {
        let usage = Usage::new(10, 20);
        assert_eq!(usage.total_tokens, 30);
    }

    #[test]
    fn test_response_content() {
        let response = LlmResponse::new(
            "id-123".to_string(),
            "qwen-turbo".to_string(),
            Message::assistant("Hello!"),
        );

        assert_eq!(response.content(), "Hello!");
        assert_eq!(response.into_content(), "Hello!");
    }

    #[test]
    fn test_finish_reason_from_vendor() {
        assert_eq!(FinishReason::from_vendor("null"), None);
        assert_eq!(FinishReason::from_vendor("stop"), Some(FinishReason::Stop));
        assert_eq!(
            FinishReason::from_vendor("length"),
            Some(FinishReason::Length)
        );
        assert_eq!(
            FinishReason::from_vendor("function_call"),
            Some(FinishReason::ToolCalls)
        );
    }

    #[test]
    fn test_stream_chunk_text_skips_empty_delta() {
        let chunk = StreamChunk::new("1".into(), "m".into()).with_delta("");
        assert_eq!(chunk.text(), None);

        let chunk = StreamChunk::new("1".into(), "m".into()).with_delta("Hel");
        assert_eq!(chunk.text(), Some("Hel"));
    }

    #[tokio::test]
    async fn test_completion_result_into_text() {
        let parts: Vec<Result<String, crate::domain::DomainError>> =
            vec![Ok("Hel".into()), Ok("lo".into())];
        let result = CompletionResult::Stream(Box::pin(futures::stream::iter(parts)));
        assert!(result.is_stream());
        assert_eq!(result.into_text().await.unwrap(), "Hello");

        let result = CompletionResult::Text("done".into());
        assert_eq!(result.into_text().await.unwrap(), "done");
    }
}
