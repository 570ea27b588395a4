//! Extraction run lifecycle
//!
//! A run is created in [`RunStatus::Processing`] and makes exactly one
//! terminal transition, either to `Completed` or to `Failed`.

use crate::document::FileKind;
use crate::id::RunId;
use crate::task::TaskHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Status of an extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Chunks are being analyzed
    Processing,
    /// Pipeline finished; summary and snapshot recorded
    Completed,
    /// Pipeline aborted; error message recorded
    Failed,
}

impl RunStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "processing" => Some(RunStatus::Processing),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    /// Whether no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Processing)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid run status: {}", s))
    }
}

/// Summary recorded when a run completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of chunks the document was split into
    pub chunks: usize,
    /// Number of records produced by the pipeline
    pub total_extracted: usize,
}

/// One invocation of the pipeline against one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRun {
    /// Unique identifier
    pub id: RunId,

    /// Name of the source document
    pub filename: String,

    /// Kind of the source document
    pub file_kind: FileKind,

    /// Owning application, if any
    pub application_id: Option<i64>,

    /// Handle of the first submitted task
    pub task_handle: Option<TaskHandle>,

    /// Current status
    pub status: RunStatus,

    /// Start time (seconds since epoch)
    pub started_at: u64,

    /// Time of the terminal transition
    pub completed_at: Option<u64>,

    /// Summary, set on completion
    pub summary: Option<RunSummary>,

    /// Snapshot of the extracted records, set on completion
    pub extracted_data: Option<Value>,

    /// Error message, set on failure
    pub error: Option<String>,

    /// User who started the run
    pub user_id: Option<i64>,
}

impl ExtractionRun {
    /// Create a new run in `processing` state
    pub fn start(
        filename: impl Into<String>,
        file_kind: FileKind,
        application_id: Option<i64>,
        user_id: Option<i64>,
        started_at: u64,
    ) -> Self {
        Self {
            id: RunId::new(),
            filename: filename.into(),
            file_kind,
            application_id,
            task_handle: None,
            status: RunStatus::Processing,
            started_at,
            completed_at: None,
            summary: None,
            extracted_data: None,
            error: None,
            user_id,
        }
    }

    /// Build the update that completes this run
    ///
    /// Fails if the run already reached a terminal state.
    pub fn complete(
        &self,
        summary: RunSummary,
        extracted_data: Value,
        completed_at: u64,
    ) -> Result<RunUpdate, RunTransitionError> {
        self.ensure_processing(RunStatus::Completed)?;
        Ok(RunUpdate {
            status: Some(RunStatus::Completed),
            completed_at: Some(completed_at),
            summary: Some(summary),
            extracted_data: Some(extracted_data),
            ..RunUpdate::default()
        })
    }

    /// Build the update that fails this run
    ///
    /// Fails if the run already reached a terminal state.
    pub fn fail(
        &self,
        error: impl Into<String>,
        completed_at: u64,
    ) -> Result<RunUpdate, RunTransitionError> {
        self.ensure_processing(RunStatus::Failed)?;
        Ok(RunUpdate {
            status: Some(RunStatus::Failed),
            completed_at: Some(completed_at),
            error: Some(error.into()),
            ..RunUpdate::default()
        })
    }

    /// Apply an update to the in-memory copy
    pub fn apply(&mut self, update: &RunUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(handle) = &update.task_handle {
            self.task_handle = Some(handle.clone());
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(summary) = update.summary {
            self.summary = Some(summary);
        }
        if let Some(data) = &update.extracted_data {
            self.extracted_data = Some(data.clone());
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
    }

    fn ensure_processing(&self, to: RunStatus) -> Result<(), RunTransitionError> {
        if self.status.is_terminal() {
            return Err(RunTransitionError {
                run_id: self.id,
                current: self.status,
                requested: to,
            });
        }
        Ok(())
    }
}

/// Partial update of a run row; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUpdate {
    /// New status
    pub status: Option<RunStatus>,
    /// Handle of the first submitted task
    pub task_handle: Option<TaskHandle>,
    /// Time of the terminal transition
    pub completed_at: Option<u64>,
    /// Completion summary
    pub summary: Option<RunSummary>,
    /// Record snapshot
    pub extracted_data: Option<Value>,
    /// Failure message
    pub error: Option<String>,
}

impl RunUpdate {
    /// Update that only records the upstream task handle
    pub fn task_handle(handle: TaskHandle) -> Self {
        Self {
            task_handle: Some(handle),
            ..Self::default()
        }
    }
}

/// A second terminal transition was attempted on a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("run {run_id} is already {current}, cannot move to {requested}")]
pub struct RunTransitionError {
    /// Run concerned
    pub run_id: RunId,
    /// Status the run is already in
    pub current: RunStatus,
    /// Status that was requested
    pub requested: RunStatus,
}
