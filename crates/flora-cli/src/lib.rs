//! # flora-cli
//!
//! Command-line interface for Flora catalog curation.
//!
//! ## Commands
//!
//! - `flora reconcile` - Run a reconciliation pass over an asset tree
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `FLORA_ASSET_ROOT` - Local asset directory
//! - `FLORA_STORAGE_BUCKET` - Object-storage bucket (`s3://...` or `gs://...`)
//! - `FLORA_CATALOG_SNAPSHOT` - Object key of the published snapshot

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use clap::{Parser, Subcommand};

/// Flora CLI - catalog curation command-line interface.
#[derive(Debug, Parser)]
#[command(name = "flora")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a reconciliation pass over an asset tree.
    Reconcile(commands::reconcile::ReconcileArgs),
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}
