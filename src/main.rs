//! Sikt CLI entry point.

use anyhow::Result;
use clap::Parser;
use sikt::cli::{commands, Cli, Commands};
use sikt::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("sikt={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Import { input, replace } => {
            commands::run_import(input, *replace, settings).await?;
        }

        Commands::Ask { question, model } => {
            commands::run_ask(question, model.clone(), settings).await?;
        }

        Commands::Search { query, limit } => {
            commands::run_search(query, *limit, settings).await?;
        }

        Commands::Chat { model } => {
            commands::run_chat(model.clone(), settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
