use clap::Parser;
use smart_ta_llm::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => cli::generate::run(args).await,
        Command::Providers => cli::providers::run().await,
    }
}
