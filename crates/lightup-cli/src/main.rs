//! LightUp CLI - manage alarms and keep them in sync with a LightUpPi server
//!
//! The main task plays the part of the UI context: sync results and server
//! status callbacks are applied and printed from here.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::{run_add, AddOptions};
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, EditOptions};
use crate::commands::list::run_list;
use crate::commands::server::{run_ping, run_watch};
use crate::commands::show::run_show;
use crate::commands::sync::{run_get, run_pull, run_push};
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "lightup=info";

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
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::List { filter, json } => run_list(filter.into(), json, &db_path).await?,
        Commands::Show { id } => run_show(&id, &db_path).await?,
        Commands::Add {
            time,
            days,
            label,
            disabled,
            no_vibrate,
            delete_after_use,
            push,
        } => {
            let options = AddOptions {
                days,
                label,
                disabled,
                no_vibrate,
                delete_after_use,
                push,
            };
            run_add(&time, options, &db_path).await?;
        }
        Commands::Edit {
            id,
            time,
            days,
            label,
            enable,
            disable,
            local_only,
        } => {
            let options = EditOptions {
                time,
                days,
                label,
                enable,
                disable,
                local_only,
            };
            run_edit(&id, options, &db_path).await?;
        }
        Commands::Delete { id, local_only } => run_delete(&id, local_only, &db_path).await?,
        Commands::Push { id } => run_push(&id, &db_path).await?,
        Commands::Get { remote_id } => run_get(remote_id, &db_path).await?,
        Commands::Pull => run_pull(&db_path).await?,
        Commands::Ping => run_ping(&db_path).await?,
        Commands::Watch { count, interval } => run_watch(count, interval, &db_path).await?,
        Commands::Config { command } => run_config(command, &db_path).await?,
    }

    Ok(())
}
