//! # varsync
//!
//! **varsync** keeps Optimizely experiment variations in sync with the
//! scripts committed under `js/experiments/<experiment>/` in a GitHub repo.
//!
//! Features:
//! - `varsync serve` runs the `/_hooks` webhook endpoint and the worker
//! - `varsync reconcile <payload.json>` replays a stored push payload
//! - `varsync experiments` lists the project's experiments
//! - `varsync home` prints the config directory
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use varsync::{cmd_experiments, cmd_reconcile, cmd_serve, init_logging, load_config, paths};

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "varsync",
    version,
    about = "varsync - sync Optimizely variations from GitHub pushes",
    arg_required_else_help = true
)]
struct Cli {
    /// Path to config.toml (defaults to `$(varsync home)/config.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the webhook server and reconciliation worker
    Serve {
        /// Address to listen on, overriding `listen` in config.toml
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Reconcile once from a stored webhook payload
    Reconcile {
        /// JSON push payload with a `commits` array
        payload: PathBuf,
    },
    /// List experiments of the configured project
    Experiments {
        /// Filter as field:value, repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
    /// Print the varsync config directory
    Home,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.cmd {
        Cmd::Serve { listen } => cmd_serve(&load_config(config)?, listen),
        Cmd::Reconcile { payload } => cmd_reconcile(&load_config(config)?, &payload),
        Cmd::Experiments { filters } => cmd_experiments(&load_config(config)?, &filters),
        Cmd::Home => {
            println!("{}", paths()?.home.display());
            Ok(())
        }
    }
}
