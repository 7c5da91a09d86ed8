//! LLM provider implementations

mod factory;
mod http_client;
mod openai;
mod registry;
mod sse;
mod tongyi;

pub use factory::LlmProviderFactory;
pub use http_client::{ByteStream, HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;
pub use registry::{
    CacheStats, GenerateRequest, LlmHandle, ProviderRegistry, ProviderStatus, RegistryDefaults,
    generate_llm_response,
};
pub use sse::{SseDecoder, data_events};
pub use tongyi::TongyiProvider;
