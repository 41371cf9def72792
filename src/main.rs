// Storefront CLI
// Entry point: parse arguments, load configuration, dispatch the command

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Commands;
use storefront_sync::{observability, StorefrontConfig};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Validation waits until we know whether the command is `config validate`
    let mut config = StorefrontConfig::read(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    observability::init(&config.logging)?;
    debug!(config = %cli.config, base_url = %config.api.base_url, "Configuration loaded");

    match cli.command {
        Commands::Config { action } => cli::commands::config_command(action, &config),
        Commands::Store(command) => {
            config
                .validate()
                .with_context(|| format!("Invalid configuration in {}", cli.config))?;
            cli::commands::execute(command, config).await
        }
    }
}
