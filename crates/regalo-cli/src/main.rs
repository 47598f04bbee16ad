//! Regalo CLI - Browse and reserve gifts from a wedding registry
//!
//! Reservations sync through the configured Supabase table, or stay in
//! process when no backend is configured.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::accounts::run_accounts;
use crate::commands::common::resolve_site_path;
use crate::commands::completions::run_completions;
use crate::commands::gifts::run_gifts;
use crate::commands::info::run_info;
use crate::commands::release::run_release;
use crate::commands::reserve::run_reserve;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("regalo=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let site_path = resolve_site_path(cli.site);

    match cli.command {
        Commands::Info { json } => run_info(json, &site_path)?,
        Commands::Gifts { available, json } => run_gifts(available, json, &site_path).await?,
        Commands::Reserve {
            gift_id,
            name,
            note,
            force,
        } => {
            run_reserve(
                &gift_id,
                name.as_deref(),
                note.as_deref(),
                force,
                &site_path,
            )
            .await?;
        }
        Commands::Release { gift_id, yes } => run_release(&gift_id, yes, &site_path).await?,
        Commands::Watch { json } => run_watch(json, &site_path).await?,
        Commands::Accounts { json } => run_accounts(json, &site_path)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
