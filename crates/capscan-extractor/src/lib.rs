//! capscan Extractor
//!
//! Turns technical documents into canonical capability records.
//!
//! # Overview
//!
//! The pipeline reads a document, splits its text into bounded chunks, runs
//! one asynchronous analysis task per chunk, recovers records from whatever
//! the tasks returned, standardizes them in a single pass and records the run.
//! Persisting the capabilities is a separate, explicit step owned by the
//! caller.
//!
//! # Architecture
//!
//! ```text
//! Document → TextSource → Chunker → TaskClient (submit + poll) → ResultParser
//!          → Standardizer → ExtractionLedger (run record) → caller → persist_capabilities
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use capscan_analysis::MockAnalysisService;
//! use capscan_domain::{Credentials, FileKind, Provenance};
//! use capscan_extractor::{ExtractionLedger, ExtractionRequest, ExtractorConfig, FileTextSource};
//! use capscan_store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MockAnalysisService::new(r#"[{"name": "createOrder"}]"#);
//! let store = SqliteStore::new(":memory:")?;
//! let ledger = ExtractionLedger::new(service, store, ExtractorConfig::default())?;
//!
//! let request = ExtractionRequest {
//!     path: "uploads/orders-guide.txt".into(),
//!     filename: "orders-guide.txt".to_string(),
//!     file_kind: FileKind::Text,
//!     application_id: Some(1),
//!     application_name: Some("Orders".to_string()),
//!     user_id: None,
//!     credentials: Some(Credentials::new("api-key", "alice")),
//! };
//!
//! let result = ledger.extract_capabilities(&request, &FileTextSource::new()).await?;
//!
//! // Persist exactly once
//! let provenance = Provenance::new(&request.filename, "analysis-service");
//! let outcome = ledger.persist_capabilities(1, &result.capabilities, &provenance)?;
//! println!("Saved {} capabilities, {} failed", outcome.success_count, outcome.failed_count);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod document;
mod error;
mod ledger;
mod parser;
mod prompt;
mod standardizer;
mod task;
mod types;


pub use chunking::TextChunker;
pub use config::{ExtractorConfig, PollConfig};
pub use document::{DocumentError, FileTextSource};
pub use error::ExtractorError;
pub use ledger::ExtractionLedger;
pub use parser::{
    flatten_records, strip_envelope, DirectParse, RepairStrategy, ResultParser, ServiceRepair,
    TruncationRepair,
};
pub use prompt::PromptBuilder;
pub use standardizer::Standardizer;
pub use task::TaskClient;
pub use types::{
    Chunk, DocumentContext, ExtractionRequest, ExtractionResult, PersistFailure, PersistOutcome,
};
