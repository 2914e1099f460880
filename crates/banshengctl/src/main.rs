//! Bansheng Control - CLI for the pregnancy knowledge base
//!
//! Opens (and seeds when needed) the local fact store, then runs one query.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_ref())?;

    // RUST_LOG wins over [logging] level; logs go to stderr so --json stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Neither touches the store
    match &cli.command {
        Commands::Config => return commands::handle_config(&config),
        Commands::Intent { text, json } => return commands::handle_intent(text, *json),
        _ => {}
    }

    let session = Session::open(&config, cli.db).await?;

    match cli.command {
        Commands::Init { json } => commands::handle_init(&session, json).await,
        Commands::Stats { json } => commands::handle_stats(&session, json).await,
        Commands::Search { kind, query, limit, json } => {
            commands::handle_search(&session, kind, &query, limit, json).await
        }
        Commands::Food { name, json } => commands::handle_food(&session, &name, json).await,
        Commands::Category { name, json } => commands::handle_category(&session, &name, json).await,
        Commands::Evaluate { symptom_id, answers, json } => {
            commands::handle_evaluate(&session, &symptom_id, &answers, json).await
        }
        Commands::Prompt { message, due_date, warning_signs } => {
            commands::handle_prompt(session, &message, due_date, warning_signs).await
        }
        Commands::Config | Commands::Intent { .. } => Ok(()),
    }
}
