//! Providers command - lists supported vendors and the active configuration

use crate::infrastructure::llm::{ProviderRegistry, ProviderStatus};

/// Run the providers command
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let registry = ProviderRegistry::new(config.llm)?;

    let defaults = registry.defaults().await;
    println!("Default: {} ({})", defaults.provider, defaults.model);

    for status in registry.supported_providers() {
        println!("{}", describe(&status));
    }

    Ok(())
}

fn describe(status: &ProviderStatus) -> String {
    format!(
        "  {:<8} aliases: {:<20} key: {:<11} model: {}",
        status.kind.as_str(),
        status.aliases.join(", "),
        if status.configured { "configured" } else { "missing" },
        status.model
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderKind;

    #[test]
    fn test_describe_reports_missing_key() {
        let line = describe(&ProviderStatus {
            kind: ProviderKind::Tongyi,
            aliases: ProviderKind::Tongyi.aliases(),
            configured: false,
            model: "qwen-turbo".to_string(),
        });

        assert!(line.contains("tongyi"));
        assert!(line.contains("qwen, dashscope"));
        assert!(line.contains("missing"));
        assert!(line.ends_with("qwen-turbo"));
    }
}
