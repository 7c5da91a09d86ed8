//! CLI module for the smart-TA LLM layer
//!
//! Provides subcommands for exercising the provider registry:
//! - `generate`: one completion through the registry
//! - `providers`: supported vendors and the current configuration

pub mod generate;
pub mod providers;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Smart-TA LLM - provider abstraction for the teaching assistant backend
#[derive(Parser)]
#[command(name = "smart-ta-llm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a completion for a prompt
    Generate(generate::GenerateArgs),

    /// List supported providers and their configuration
    Providers,
}

/// Load `.env`, configuration and logging shared by every subcommand
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}
