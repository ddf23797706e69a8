//! Syllabus CLI entry point.

use anyhow::Result;
use clap::Parser;
use syllabus::cli::{commands, Cli, Commands};
use syllabus::config::Settings;
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
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("syllabus={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_deref())?;

    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Ask {
            question,
            model,
            max_rounds,
            show_tools,
        } => {
            commands::run_ask(question, model.clone(), *max_rounds, *show_tools, settings).await?;
        }

        Commands::Chat { model } => {
            commands::run_chat(model.clone(), settings).await?;
        }

        Commands::Outline { course } => {
            commands::run_outline(course, settings).await?;
        }

        Commands::Courses => {
            commands::run_courses(settings).await?;
        }

        Commands::Import { file } => {
            commands::run_import(file, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
