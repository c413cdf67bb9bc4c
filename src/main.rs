//! Podsub CLI entry point.

use anyhow::Result;
use clap::Parser;
use podsub::cli::{commands, Cli, Commands};
use podsub::config::Settings;
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
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("podsub={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(config_path.as_path()))?;

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        None | Some(Commands::Recent) => {
            commands::run_recent(&settings)?;
        }

        Some(Commands::Play {
            input,
            hash,
            no_translate,
            translator,
            hide_translation,
        }) => {
            commands::run_play(
                input,
                *hash,
                *no_translate,
                translator.as_deref(),
                *hide_translation,
                settings,
            )
            .await?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
