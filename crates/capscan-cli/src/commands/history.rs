//! History command implementation.

use crate::cli::HistoryArgs;
use crate::error::Result;
use crate::output::Formatter;
use capscan_domain::traits::ExtractionStore;
use capscan_store::SqliteStore;
use std::path::Path;

/// Execute the history command.
pub fn execute_history(args: HistoryArgs, database: &Path, formatter: &Formatter) -> Result<()> {
    let store = SqliteStore::new(database)?;
    let runs = store.list_runs(args.app_id)?;
    println!("{}", formatter.format_runs(&runs)?);
    Ok(())
}
