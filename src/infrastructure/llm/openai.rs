use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use super::sse::{data_events, stop_after_error};
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, LlmStream, Message,
    ProviderKind, StreamChunk, Usage,
};

const PROVIDER: &str = "openai";

/// OpenAI-compatible chat completions provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, ProviderKind::OpenAi.default_base_url())
    }

    /// `base_url` includes the API version segment, e.g. `https://api.openai.com/v1`
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> = request
            .messages
            .iter()
            .map(OpenAiMessage::from_domain)
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": request.stream,
        });

        let options = &request.options;

        if let Some(temp) = options.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(top_p) = options.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        if let Some(ref stop) = options.stop {
            body["stop"] = serde_json::json!(stop);
        }

        // Vendor extras go top-level; they never replace the core fields
        for (key, value) in &options.extra {
            if body.get(key).is_none() {
                body[key.as_str()] = value.clone();
            }
        }

        body
    }

    fn headers(&self, stream: bool) -> Vec<(&str, &str)> {
        let mut headers = vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        if stream {
            headers.push(("Accept", "text/event-stream"));
        }

        headers
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = response.error {
            return Err(error.into_domain());
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider(PROVIDER, "No choices in response"))?;

        let message = Message::assistant(choice.message.content.unwrap_or_default());

        let mut llm_response = LlmResponse::new(response.id, response.model, message);

        if let Some(reason) = choice.finish_reason.as_deref().and_then(FinishReason::from_vendor) {
            llm_response = llm_response.with_finish_reason(reason);
        }

        if let Some(usage) = response.usage {
            let usage = Usage::new(usage.prompt_tokens, usage.completion_tokens);
            llm_response = llm_response.with_usage(usage);
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let mut req = request;
        req.stream = false;

        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);

        tracing::debug!(
            provider = PROVIDER,
            model,
            messages = req.messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post_json(&url, self.headers(false), &body)
            .await
            .map_err(|e| e.with_provider(PROVIDER))?;

        self.parse_response(response)
    }

    async fn chat_stream(
        &self,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError> {
        let mut req = request;
        req.stream = true;

        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);

        tracing::debug!(
            provider = PROVIDER,
            model,
            messages = req.messages.len(),
            "Opening chat stream"
        );

        let byte_stream = self
            .client
            .post_json_stream(&url, self.headers(true), &body)
            .await
            .map_err(|e| e.with_provider(PROVIDER))?;

        let model = model.to_string();
        let stream = data_events(byte_stream).map(move |event| match event {
            Ok(data) => parse_stream_event(&data, &model),
            Err(e) => Err(e.with_provider(PROVIDER)),
        });

        Ok(Box::pin(stop_after_error(stream)))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn available_models(&self) -> Vec<&'static str> {
        vec!["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"]
    }
}

fn parse_stream_event(data: &str, model: &str) -> Result<StreamChunk, DomainError> {
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(StreamChunk::new(String::new(), model.to_string())
            .with_finish_reason(FinishReason::Stop));
    }

    let chunk: OpenAiStreamChunk = serde_json::from_str(data).map_err(|e| {
        DomainError::provider(PROVIDER, format!("Malformed stream event: {}", e))
    })?;

    if let Some(error) = chunk.error {
        return Err(error.into_domain());
    }

    if chunk.id.is_none() && chunk.choices.is_empty() && chunk.usage.is_none() {
        let message = format!("Malformed stream event: {}", data);
        return Err(DomainError::provider(PROVIDER, message));
    }

    let mut stream_chunk = StreamChunk::new(
        chunk.id.unwrap_or_default(),
        chunk.model.unwrap_or_else(|| model.to_string()),
    );

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(delta) = choice.delta.and_then(|d| d.content) {
            stream_chunk = stream_chunk.with_delta(delta);
        }

        if let Some(reason) = choice.finish_reason.as_deref().and_then(FinishReason::from_vendor) {
            stream_chunk = stream_chunk.with_finish_reason(reason);
        }
    }

    if let Some(usage) = chunk.usage {
        let usage = Usage::new(usage.prompt_tokens, usage.completion_tokens);
        stream_chunk = stream_chunk.with_usage(usage);
    }

    Ok(stream_chunk)
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> OpenAiMessage<'a> {
    fn from_domain(message: &'a Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content_text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
    error: Option<OpenAiError>,
}

/// Error object sent in place of a completion, also mid-stream
#[derive(Debug, Deserialize)]
struct OpenAiError {
    #[serde(default)]
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<serde_json::Value>,
}

impl OpenAiError {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(code)) => Some(code.clone()),
            Some(serde_json::Value::Number(code)) => Some(code.to_string()),
            _ => None,
        }
    }

    fn into_domain(self) -> DomainError {
        let code = self.code();
        let label = code.as_deref().or(self.kind.as_deref());

        let message = match label {
            Some(label) => format!("{}: {}", label, self.message),
            None => self.message,
        };

        let rate_limited = [code.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .any(|c| c == "rate_limit_exceeded" || c == "429");

        if rate_limited {
            DomainError::provider_status(PROVIDER, 429, message)
        } else {
            DomainError::provider(PROVIDER, message)
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
    error: Option<OpenAiError>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: Option<OpenAiDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}
