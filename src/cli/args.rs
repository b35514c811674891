//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, customer::CustomerCommands, product::ProductCommands,
    report::ReportCommands, status::StatusArgs,
};

#[derive(Parser)]
#[command(name = "qms")]
#[command(author, version, about = "Quality records with local-first sync")]
#[command(long_about = "Manage defect reports, products and customers. Changes apply locally at once and sync to a shared remote store when it is reachable.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Local cache directory (default: platform data dir, or QMS_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Shared remote directory (default: QMS_REMOTE_DIR; none means offline)
    #[arg(long, global = true)]
    pub remote: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Defect report management
    #[command(subcommand)]
    Report(ReportCommands),

    /// Product catalog management
    #[command(subcommand)]
    Product(ProductCommands),

    /// Customer management
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Show sync status of every collection
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (pretty for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// Just keys, one per line
    Id,
}
