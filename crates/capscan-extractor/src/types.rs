//! Request and response types for extraction

use capscan_domain::{Capability, Credentials, FileKind, RawCapabilityRecord, RunId};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A bounded slice of document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position in the document
    pub index: usize,

    /// Number of chunks the document was split into
    pub total: usize,

    /// Chunk content
    pub text: String,
}

impl Chunk {
    /// One-based `(position, total)` when the document has several chunks
    pub fn position(&self) -> Option<(usize, usize)> {
        (self.total > 1).then_some((self.index + 1, self.total))
    }
}

/// What the prompt builder knows about the source document
#[derive(Debug, Clone)]
pub struct DocumentContext {
    /// Original filename
    pub filename: String,

    /// Kind of document
    pub file_kind: FileKind,

    /// Name of the owning application, if known
    pub application_name: Option<String>,
}

/// Request to run the pipeline against one document
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Location of the uploaded file
    pub path: PathBuf,

    /// Original filename (the stored file may be renamed)
    pub filename: String,

    /// Kind of document
    pub file_kind: FileKind,

    /// Owning application
    pub application_id: Option<i64>,

    /// Name of the owning application, used in prompts
    pub application_name: Option<String>,

    /// User who started the extraction
    pub user_id: Option<i64>,

    /// Credentials for the analysis service
    pub credentials: Option<Credentials>,
}

impl ExtractionRequest {
    /// Document context for prompt building
    pub fn context(&self) -> DocumentContext {
        DocumentContext {
            filename: self.filename.clone(),
            file_kind: self.file_kind.clone(),
            application_name: self.application_name.clone(),
        }
    }
}

/// Result of a completed pipeline run
///
/// Nothing in here has been persisted yet; the caller hands `capabilities`
/// to `ExtractionLedger::persist_capabilities` exactly once.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Run that produced the records
    pub run_id: RunId,

    /// Final records (standardized, or raw when standardization was skipped or failed)
    pub capabilities: Vec<RawCapabilityRecord>,

    /// Number of final records
    pub total_count: usize,

    /// Record count per functional area
    pub modules: BTreeMap<String, usize>,

    /// Raw task payloads, one per chunk, joined by newlines
    pub raw_result: String,
}

/// Outcome of persisting one batch of records
#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    /// Records stored
    pub success_count: usize,

    /// Records that could not be mapped or stored
    pub failed_count: usize,

    /// Stored capabilities, in input order
    pub saved: Vec<Capability>,

    /// One entry per failed record
    pub failures: Vec<PersistFailure>,
}

/// A record that could not be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistFailure {
    /// Position of the record in the input
    pub index: usize,

    /// Why it failed
    pub reason: String,
}
