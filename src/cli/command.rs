//! Command-line interface definitions.
//!
//! Defines the CLI structure for the updown settlement engine using `clap`.
//! The daemon mirrors the keeper's two modes: `run` loops until stopped,
//! `once` performs a single settlement cycle and exits.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pari-mutuel settlement engine for 15-minute up/down price markets
#[derive(Parser, Debug)]
#[command(name = "updown")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the updown CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the settlement orchestrator (foreground)
    Run,

    /// Run a single settlement cycle and exit
    Once {
        /// Print the cycle report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List archived markets
    Markets {
        /// Print as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file and print the effective settings
    CheckConfig,
}
