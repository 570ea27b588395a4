//! capscan Domain Layer
//!
//! Data model and boundary traits for the capability-extraction pipeline.
//! Infrastructure (analysis service clients, storage) lives in other crates
//! and plugs in through the traits defined in [`traits`].
//!
//! ## Key Concepts
//!
//! - **ExtractionRun**: one invocation of the pipeline against one document
//! - **Capability**: canonical record of one piece of exposed functionality
//! - **RawCapabilityRecord**: loosely-typed record as returned upstream
//! - **Task handle / status**: one asynchronous analysis-service invocation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod document;
pub mod id;
pub mod provenance;
pub mod record;
pub mod run;
pub mod task;
pub mod traits;

// Re-exports for convenience
pub use capability::{AvailabilityStatus, Capability, CapabilityType, InterfaceKind};
pub use document::FileKind;
pub use id::{CapabilityId, RunId};
pub use provenance::Provenance;
pub use record::RawCapabilityRecord;
pub use run::{ExtractionRun, RunStatus, RunSummary, RunTransitionError, RunUpdate};
pub use task::{Credentials, TaskHandle, TaskRequest, TaskStatus};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
