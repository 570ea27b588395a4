//! capscan - extract integration capabilities from technical documents.

use capscan_cli::commands;
use capscan_cli::config::OutputFormat;
use capscan_cli::{Cli, CliConfig, Command, Formatter};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let error_formatter = Formatter::new(OutputFormat::Table, !cli.no_color);

    if let Err(e) = run(cli).await {
        eprintln!("{}", error_formatter.error(&format!("Error: {}", e)));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> capscan_cli::Result<()> {
    if let Command::Init(args) = cli.command {
        let formatter = Formatter::new(OutputFormat::Table, !cli.no_color);
        return commands::execute_init(args, cli.config.as_deref(), &formatter);
    }

    let config = CliConfig::load(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let database = cli.db.clone().unwrap_or_else(|| config.database_path.clone());
    if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match cli.command {
        Command::Extract(args) => {
            commands::execute_extract(args, &config, &database, &formatter).await?;
        }
        Command::History(args) => {
            commands::execute_history(args, &database, &formatter)?;
        }
        Command::Init(_) => {}
    }

    Ok(())
}
