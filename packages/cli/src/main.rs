mod commands;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use console::style;
use journal_common::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "journal", version, about = "Read and write journal entries")]
pub struct Cli {
    /// Base URL of the journal server.
    #[arg(
        long,
        global = true,
        env = "JOURNAL_API_URL",
        default_value = "http://127.0.0.1:3000"
    )]
    pub api_url: String,

    /// Bearer token issued by the identity provider.
    #[arg(long, global = true, env = "JOURNAL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List entries, newest first
    List {
        /// Entries per page
        #[arg(
            long,
            default_value_t = DEFAULT_PAGE_SIZE,
            value_parser = clap::value_parser!(u64).range(1..=MAX_PAGE_SIZE)
        )]
        limit: u64,
        /// Keep paging until every entry is shown
        #[arg(long)]
        all: bool,
    },
    /// Write a new entry
    New {
        text: String,
        /// Image to attach
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Entry date (RFC 3339), defaults to now
        #[arg(long)]
        date: Option<DateTime<Utc>>,
    },
    /// Replace an entry's text
    Edit { id: Uuid, text: String },
    /// Polish an entry's text
    Polish { id: Uuid },
    /// Delete an entry and its photos
    Delete {
        id: Uuid,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
