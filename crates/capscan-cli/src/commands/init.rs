//! Init command implementation.

use crate::cli::InitArgs;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Execute the init command.
pub fn execute_init(args: InitArgs, path: Option<&Path>, formatter: &Formatter) -> Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => CliConfig::path()?,
    };

    if target.exists() && !args.force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }

    let written = CliConfig::default().save(Some(&target))?;
    println!(
        "{}",
        formatter.success(&format!("Wrote {}", written.display()))
    );
    Ok(())
}
