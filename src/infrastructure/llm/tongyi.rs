use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use super::sse::{data_events, stop_after_error};
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, LlmStream, Message,
    ProviderKind, StreamChunk, Usage,
};

const PROVIDER: &str = "tongyi";
const GENERATION_PATH: &str = "/services/aigc/text-generation/generation";

/// Tongyi Qianwen provider using the DashScope text-generation API
#[derive(Debug)]
pub struct TongyiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> TongyiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, ProviderKind::Tongyi.default_base_url())
    }

    /// `base_url` includes the API version segment,
    /// e.g. `https://dashscope.aliyuncs.com/api/v1`
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

    fn generation_url(&self) -> String {
        format!("{}{}", self.base_url, GENERATION_PATH)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<TongyiMessage> = request
            .messages
            .iter()
            .map(TongyiMessage::from_domain)
            .collect();

        let options = &request.options;

        let mut parameters = serde_json::json!({
            "result_format": "message",
        });

        if let Some(temp) = options.temperature {
            parameters["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = options.max_tokens {
            parameters["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(top_p) = options.top_p {
            parameters["top_p"] = serde_json::json!(top_p);
        }

        if let Some(ref stop) = options.stop {
            parameters["stop"] = serde_json::json!(stop);
        }

        // Deltas only, instead of the cumulative text DashScope sends by default
        if request.stream {
            parameters["incremental_output"] = serde_json::json!(true);
        }

        for (key, value) in &options.extra {
            if parameters.get(key).is_none() {
                parameters[key.as_str()] = value.clone();
            }
        }

        serde_json::json!({
            "model": model,
            "input": { "messages": messages },
            "parameters": parameters,
        })
    }

    fn headers(&self, stream: bool) -> Vec<(&str, &str)> {
        let mut headers = vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        if stream {
            headers.push(("Accept", "text/event-stream"));
            headers.push(("X-DashScope-SSE", "enable"));
        }

        headers
    }

    fn parse_response(
        &self,
        model: &str,
        json: serde_json::Value,
    ) -> Result<LlmResponse, DomainError> {
        let response: TongyiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = response.error() {
            return Err(error);
        }

        let output = response
            .output
            .ok_or_else(|| DomainError::provider(PROVIDER, "No output in response"))?;

        let (content, finish_reason) = output
            .into_text()
            .ok_or_else(|| DomainError::provider(PROVIDER, "No choices in response"))?;

        let mut llm_response = LlmResponse::new(
            response.request_id.unwrap_or_default(),
            model.to_string(),
            Message::assistant(content),
        );

        if let Some(reason) = finish_reason.as_deref().and_then(FinishReason::from_vendor) {
            llm_response = llm_response.with_finish_reason(reason);
        }

        if let Some(usage) = response.usage {
            llm_response = llm_response.with_usage(usage.into());
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for TongyiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let mut req = request;
        req.stream = false;

        let url = self.generation_url();
        let body = self.build_request(model, &req);

        tracing::debug!(
            provider = PROVIDER,
            model,
            messages = req.messages.len(),
            "Sending generation request"
        );

        let response = self
            .client
            .post_json(&url, self.headers(false), &body)
            .await
            .map_err(|e| e.with_provider(PROVIDER))?;

        self.parse_response(model, response)
    }

    async fn chat_stream(
        &self,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError> {
        let mut req = request;
        req.stream = true;

        let url = self.generation_url();
        let body = self.build_request(model, &req);

        tracing::debug!(
            provider = PROVIDER,
            model,
            messages = req.messages.len(),
            "Opening generation stream"
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
        ProviderKind::Tongyi
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn available_models(&self) -> Vec<&'static str> {
        vec!["qwen-turbo", "qwen-plus", "qwen-max", "qwen-long"]
    }
}

fn parse_stream_event(data: &str, model: &str) -> Result<StreamChunk, DomainError> {
    let event: TongyiResponse = serde_json::from_str(data.trim()).map_err(|e| {
        DomainError::provider(PROVIDER, format!("Malformed stream event: {}", e))
    })?;

    if let Some(error) = event.error() {
        return Err(error);
    }

    let mut chunk = StreamChunk::new(event.request_id.unwrap_or_default(), model.to_string());

    if let Some((content, finish_reason)) = event.output.and_then(TongyiOutput::into_text) {
        chunk = chunk.with_delta(content);

        if let Some(reason) = finish_reason.as_deref().and_then(FinishReason::from_vendor) {
            chunk = chunk.with_finish_reason(reason);
        }
    }

    if let Some(usage) = event.usage {
        chunk = chunk.with_usage(usage.into());
    }

    Ok(chunk)
}

// DashScope API types

#[derive(Debug, Serialize)]
struct TongyiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> TongyiMessage<'a> {
    fn from_domain(message: &'a Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content_text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TongyiResponse {
    output: Option<TongyiOutput>,
    usage: Option<TongyiUsage>,
    request_id: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl TongyiResponse {
    /// DashScope reports failures in-band with `code`/`message`
    fn error(&self) -> Option<DomainError> {
        if self.output.is_some() {
            return None;
        }

        let code = self.code.as_deref().filter(|c| !c.is_empty())?;
        let detail = self.message.as_deref().unwrap_or_default();
        let message = format!("{}: {}", code, detail);

        Some(DomainError::provider(PROVIDER, message))
    }
}

#[derive(Debug, Deserialize)]
struct TongyiOutput {
    #[serde(default)]
    choices: Vec<TongyiChoice>,
    text: Option<String>,
    finish_reason: Option<String>,
}

impl TongyiOutput {
    /// Text and finish reason from either `result_format` shape
    fn into_text(self) -> Option<(String, Option<String>)> {
        match self.choices.into_iter().next() {
            Some(choice) => {
                let content = choice.message.content.unwrap_or_default();
                Some((content, choice.finish_reason))
            }
            None => self.text.map(|text| (text, self.finish_reason)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TongyiChoice {
    message: TongyiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TongyiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TongyiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl From<TongyiUsage> for Usage {
    fn from(usage: TongyiUsage) -> Self {
        Usage::new(usage.input_tokens, usage.output_tokens)
    }
}
