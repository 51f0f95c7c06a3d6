//! Command line interface for the `marathon` binary.
//!
//! Kept free of crate-internal imports so `build.rs` can include it to render
//! the man page.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line arguments for the `marathon` binary.
#[derive(Debug, Parser)]
#[command(name = "marathon", version, about = "Marathon push notification API")]
pub struct Cli {
    /// Directory holding `default.yaml` and per-environment overrides.
    #[arg(short, long, default_value = "config")]
    pub config_dir: PathBuf,
    /// Configuration environment to load. Defaults to `$MARATHON_ENV`, then
    /// `development`.
    #[arg(short, long)]
    pub env: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands accepted by the binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP API and serve until Ctrl+C.
    Start {
        /// Override `app.host`.
        #[arg(long)]
        host: Option<String>,
        /// Override `app.port`.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the version and exit.
    Version,
}
