// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notify - durable notification fan-out.
//!
//! This is the binary entry point. `serve` runs the scheduler and the
//! dispatch queue until a shutdown signal; the other subcommands run one
//! operation and exit, for use from an external cron or by hand.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod runtime;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use notify_config::NotifyConfig;

/// Notify - durable notification fan-out.
#[derive(Parser, Debug)]
#[command(name = "notify", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler and the dispatch queue until SIGINT/SIGTERM.
    Serve {
        /// Also accept dispatch events as JSON lines on stdin.
        #[arg(long)]
        stdin: bool,
    },
    /// Run one queue batch and exit.
    Process,
    /// Delete completed jobs older than the retention window.
    Cleanup {
        /// Override `queue.retention_days`.
        #[arg(long)]
        days: Option<u32>,
    },
    /// Reset monthly alert counters that are due.
    ResetQuotas,
    /// Dispatch one notification immediately.
    Dispatch {
        #[arg(long)]
        app_id: i64,
        #[arg(long)]
        user_id: i64,
        /// Notification message.
        message: String,
        /// Structured details, as a JSON value.
        #[arg(long)]
        details: Option<String>,
    },
    /// Encrypt a channel credential for storage. Prompts when no value is given.
    Encrypt { value: Option<String> },
    /// Show job counts by status.
    Status,
}

fn load_config(path: Option<&std::path::Path>) -> NotifyConfig {
    let loaded = match path {
        Some(path) => notify_config::load_and_validate_path(path),
        None => notify_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            notify_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.service.log_level);

    let reads_stdin = matches!(cli.command, Some(Commands::Serve { stdin: true }));
    let result = match cli.command {
        Some(Commands::Serve { stdin }) => serve::run_serve(config, stdin).await,
        Some(Commands::Process) => commands::process(&config).await,
        Some(Commands::Cleanup { days }) => commands::cleanup(&config, days).await,
        Some(Commands::ResetQuotas) => commands::reset_quotas(&config).await,
        Some(Commands::Dispatch {
            app_id,
            user_id,
            message,
            details,
        }) => commands::dispatch(&config, app_id, user_id, &message, details.as_deref()).await,
        Some(Commands::Encrypt { value }) => commands::encrypt(&config, value),
        Some(Commands::Status) => commands::status(&config).await,
        None => {
            println!("notify: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    // A pending stdin read would otherwise hold runtime shutdown until the next line.
    if reads_stdin {
        std::process::exit(0);
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("notify={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
