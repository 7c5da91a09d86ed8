//! Generate command - one completion through the provider registry

use std::io::Write;

use clap::Args;
use futures::StreamExt;
use tracing::info;

use crate::domain::{CompletionResult, GenerationOptions, Message, ProviderOverrides};
use crate::infrastructure::llm::{GenerateRequest, ProviderRegistry};

/// Arguments for the generate command
#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// User prompt
    pub prompt: String,

    /// Optional system prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Provider name (defaults to the configured provider)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name (defaults to the configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL override for the provider
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print fragments as they arrive
    #[arg(long)]
    pub stream: bool,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl GenerateArgs {
    fn into_request(self) -> GenerateRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(self.prompt));

        let mut options = GenerationOptions::default();
        if let Some(temperature) = self.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        let mut overrides = ProviderOverrides::new();
        if let Some(base_url) = self.base_url {
            overrides = overrides.base_url(base_url);
        }

        let mut request = GenerateRequest::new(messages)
            .stream(self.stream)
            .options(options)
            .overrides(overrides);
        if let Some(provider) = self.provider {
            request = request.provider(provider);
        }
        if let Some(model) = self.model {
            request = request.model(model);
        }

        request
    }
}

/// Run the generate command
pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let registry = ProviderRegistry::new(config.llm)?;

    let request = args.into_request();
    info!(
        provider = request.provider.as_deref().unwrap_or("default"),
        stream = request.stream,
        "Generating completion"
    );

    match registry.generate_llm_response(request).await? {
        CompletionResult::Text(text) => println!("{}", text),
        CompletionResult::Stream(mut stream) => {
            let mut stdout = std::io::stdout();
            while let Some(fragment) = stream.next().await {
                write!(stdout, "{}", fragment?)?;
                stdout.flush()?;
            }
            writeln!(stdout)?;
        }
    }

    Ok(())
}
