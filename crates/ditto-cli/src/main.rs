//! ditto CLI - offline-first task list from the terminal
//!
//! Every change lands in the local database first and is queued for the sync
//! endpoint; `ditto sync` and `ditto watch` push the queue when online.

mod cli;
mod cli_config;
mod commands;
mod error;
mod probe;


use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::outbox::run_outbox;
use crate::commands::sync::run_sync;
use crate::commands::toggle::run_toggle;
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

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "ditto=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Some(Commands::Add { text }) => run_add(&text, &db_path).await?,
        Some(Commands::List { json }) => run_list(json, &db_path).await?,
        Some(Commands::Toggle { id }) => run_toggle(&id, &db_path).await?,
        Some(Commands::Delete { id }) => run_delete(&id, &db_path).await?,
        Some(Commands::Sync { endpoint }) => run_sync(endpoint, &db_path).await?,
        Some(Commands::Outbox { json }) => run_outbox(json, &db_path).await?,
        Some(Commands::Watch { endpoint, interval }) => {
            run_watch(endpoint, interval, &db_path).await?;
        }
        Some(Commands::Config { command }) => run_config(command)?,
        None => {
            // Quick capture mode: ditto "buy milk"
            if cli.task.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.task, &db_path).await?;
            }
        }
    }

    Ok(())
}
