//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction pipeline and
//! infrastructure. Implementations live in other crates.

use crate::{
    Capability, CapabilityId, Credentials, ExtractionRun, FileKind, RunId, RunUpdate,
    TaskHandle, TaskRequest, TaskStatus,
};
use async_trait::async_trait;
use std::path::Path;

/// External capability-analysis service
///
/// Implemented by the infrastructure layer (capscan-analysis)
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Error type for service operations
    type Error: std::fmt::Display + Send;

    /// Submit one task and return its handle
    async fn submit(
        &self,
        request: &TaskRequest,
        credentials: &Credentials,
    ) -> Result<TaskHandle, Self::Error>;

    /// Fetch the current status of a task
    async fn get_status(&self, handle: &TaskHandle) -> Result<TaskStatus, Self::Error>;
}

/// Turns a stored document into plain text
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Error type for extraction failures
    type Error: std::fmt::Display + Send;

    /// Extract the text of the file at `path`
    async fn extract_text(&self, path: &Path, kind: &FileKind) -> Result<String, Self::Error>;
}

/// Durable storage for runs and capabilities
///
/// Implemented by the infrastructure layer (capscan-store)
pub trait ExtractionStore {
    /// Error type for store operations
    type Error;

    /// Insert a new run row
    fn create_run(&mut self, run: &ExtractionRun) -> Result<(), Self::Error>;

    /// Apply a partial update to a run row
    fn update_run(&mut self, id: RunId, update: &RunUpdate) -> Result<(), Self::Error>;

    /// Get a run by ID
    fn get_run(&self, id: RunId) -> Result<Option<ExtractionRun>, Self::Error>;

    /// List runs ordered by start time, optionally for one application
    fn list_runs(&self, application_id: Option<i64>) -> Result<Vec<ExtractionRun>, Self::Error>;

    /// Insert one capability
    fn create_capability(&mut self, capability: &Capability) -> Result<CapabilityId, Self::Error>;

    /// List the capabilities of an application
    fn list_capabilities(&self, application_id: i64) -> Result<Vec<Capability>, Self::Error>;
}
