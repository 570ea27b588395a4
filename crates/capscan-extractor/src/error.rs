//! Error types for the extraction pipeline

use capscan_domain::{RunTransitionError, TaskHandle};
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Task could not be submitted (missing credentials, transport, rejection)
    #[error("Submission error: {0}")]
    Submission(String),

    /// Status request failed at the transport level
    #[error("Status error: {0}")]
    Status(String),

    /// Analysis task reported failure
    #[error("Task {handle} failed: {message}")]
    TaskFailed {
        /// Handle of the failed task
        handle: TaskHandle,
        /// Upstream error message
        message: String,
    },

    /// Analysis task did not finish within its poll budget
    #[error("Task {handle} timed out after {attempts} polls")]
    TaskTimeout {
        /// Handle of the unfinished task
        handle: TaskHandle,
        /// Number of polls made
        attempts: u32,
    },

    /// Task output could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Standardization pass failed
    #[error("Standardization error: {0}")]
    Standardization(String),

    /// Extraction store error
    #[error("Store error: {0}")]
    Store(String),

    /// Source document could not be read
    #[error("Document error: {0}")]
    Document(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Illegal run state change
    #[error("Transition error: {0}")]
    Transition(#[from] RunTransitionError),
}

impl ExtractorError {
    /// Whether this error aborts the run
    ///
    /// Parse and standardization failures are absorbed by the pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ExtractorError::Parse(_) | ExtractorError::Standardization(_)
        )
    }
}
