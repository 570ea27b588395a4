//! capscan CLI library.
//!
//! Configuration, command execution and output formatting for the `capscan`
//! binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::CliConfig;
pub use error::{CliError, Result};
pub use output::Formatter;
