use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Map messy loan spreadsheet exports onto the loaner ledger",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a spreadsheet export (XLSX or CSV/TSV) into the loaner table
    Ingest(IngestArgs),
    /// List every persisted loaner in natural identifier order
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Input spreadsheet file (.xlsx, .csv, .tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// SQLite database path or sqlite: connection URL
    #[arg(short = 'd', long = "database", default_value = "loaners.db")]
    pub database: String,
    /// YAML file overriding the built-in header alias table
    #[arg(long)]
    pub aliases: Option<PathBuf>,
    /// Header matches required before the direct column mapping is trusted
    #[arg(long = "min-direct-fields", default_value_t = 4)]
    pub min_direct_fields: usize,
    /// Rows sampled per column by the content heuristic
    #[arg(long = "sample-rows", default_value_t = 50)]
    pub sample_rows: usize,
    /// Remote mapping classifier endpoint (omit to run without it)
    #[arg(long = "classifier-url")]
    pub classifier_url: Option<String>,
    /// Bearer token for the remote mapping classifier
    #[arg(long = "classifier-token")]
    pub classifier_token: Option<String>,
    /// Emit the full ingest report as JSON instead of a summary table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// SQLite database path or sqlite: connection URL
    #[arg(short = 'd', long = "database", default_value = "loaners.db")]
    pub database: String,
    /// Emit records as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
