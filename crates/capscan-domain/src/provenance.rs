//! Provenance of extracted capabilities

use serde::{Deserialize, Serialize};

/// Where a capability came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Name of the document the capability was extracted from
    pub source_filename: String,

    /// Extraction method label (e.g., "analysis-service", "manual")
    pub extraction_method: String,
}

impl Provenance {
    /// Create a new provenance entry
    pub fn new(source_filename: impl Into<String>, extraction_method: impl Into<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            extraction_method: extraction_method.into(),
        }
    }
}
