//! Peon CLI entry point.

use anyhow::Result;
use clap::Parser;
use peon::cli::{commands, log_level, Cli, Commands};
use peon::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let level = log_level(cli.verbose, &settings.general.log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("peon={},tower_http={}", level, level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    if !matches!(cli.command, Commands::Config { .. }) {
        std::fs::create_dir_all(settings.data_dir())?;
    }

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings, config_path.as_ref()).await?;
        }

        Commands::Ingest { path } => {
            commands::run_ingest(path, &settings).await?;
        }

        Commands::Sources => {
            commands::run_sources(&settings).await?;
        }

        Commands::Ask { question } => {
            commands::run_ask(question, settings).await?;
        }

        Commands::Chat => {
            commands::run_chat(settings).await?;
        }

        Commands::History => {
            commands::run_history(&settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}
