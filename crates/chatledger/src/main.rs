// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! chatledger - group chat activity ledger.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;

use chatledger_core::{ChatId, UserId};
use clap::{Parser, Subcommand};
use tracing::error;

/// chatledger - records group messages, reactions and memberships.
#[derive(Parser, Debug)]
#[command(name = "chatledger", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline consumers and the periodic replay sweep.
    Serve,
    /// Process unprocessed raw events once and exit.
    Replay,
    /// Import updates from a JSON lines file as pending raw events.
    Ingest {
        /// One Bot API update per line.
        file: PathBuf,
    },
    /// Refresh one user or chat from the platform.
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },
}

#[derive(Subcommand, Debug)]
enum SyncTarget {
    /// Refresh a user's profile photo.
    User {
        #[arg(allow_negative_numbers = true)]
        id: UserId,
    },
    /// Refresh a chat's details and photo.
    Chat {
        #[arg(allow_negative_numbers = true)]
        id: ChatId,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => chatledger_config::load_and_validate_path(path),
        None => chatledger_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatledger_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Replay => commands::run_replay(config).await,
        Commands::Ingest { file } => commands::run_ingest(config, &file).await,
        Commands::Sync { target } => match target {
            SyncTarget::User { id } => commands::run_sync_user(config, id).await,
            SyncTarget::Chat { id } => commands::run_sync_chat(config, id).await,
        },
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatledger={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
