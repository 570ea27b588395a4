//! CLI command definitions and argument parsing.

use capscan_domain::FileKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// capscan - Extract integration capabilities from technical documents.
#[derive(Debug, Parser)]
#[command(name = "capscan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides the configuration)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract capabilities from a document
    Extract(ExtractArgs),

    /// List extraction runs
    History(HistoryArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Document to analyze
    pub path: PathBuf,

    /// Document kind (inferred from the extension when omitted)
    #[arg(short, long, value_enum)]
    pub kind: Option<KindArg>,

    /// Application the capabilities belong to; without it nothing is persisted
    #[arg(short, long)]
    pub app_id: Option<i64>,

    /// Application name passed to the analysis prompt
    #[arg(long)]
    pub app_name: Option<String>,

    /// User starting the run
    #[arg(long)]
    pub user_id: Option<i64>,

    /// Analysis service API key
    #[arg(long, env = "CAPSCAN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Analysis service username
    #[arg(long, env = "CAPSCAN_USERNAME")]
    pub username: Option<String>,

    /// Delete the document once the run has finished, successful or not
    #[arg(long)]
    pub remove_source: bool,
}

/// Arguments for the history command.
#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// Only runs of this application
    #[arg(short, long)]
    pub app_id: Option<i64>,
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Document kind argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum KindArg {
    /// PDF document
    Pdf,
    /// Plain text
    Text,
    /// Word document
    Word,
    /// Image or diagram
    Image,
    /// Spreadsheet
    Excel,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

impl From<KindArg> for FileKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Pdf => FileKind::Pdf,
            KindArg::Text => FileKind::Text,
            KindArg::Word => FileKind::Word,
            KindArg::Image => FileKind::Image,
            KindArg::Excel => FileKind::Excel,
        }
    }
}
