//! Source document kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Kind of source document handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FileKind {
    /// PDF document
    Pdf,
    /// Plain text
    Text,
    /// Word document
    Word,
    /// Image or diagram
    Image,
    /// Spreadsheet
    Excel,
    /// Anything else, keeping the original label
    Other(String),
}

impl FileKind {
    /// Parse a file kind from a label or extension (case-insensitive)
    pub fn parse(label: &str) -> Self {
        match label.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => FileKind::Pdf,
            "text" | "txt" | "md" => FileKind::Text,
            "word" | "doc" | "docx" => FileKind::Word,
            "image" | "png" | "jpg" | "jpeg" | "gif" | "svg" => FileKind::Image,
            "excel" | "xls" | "xlsx" | "csv" => FileKind::Excel,
            other => FileKind::Other(other.to_string()),
        }
    }

    /// Infer the kind from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::parse)
            .unwrap_or_else(|| FileKind::Other(String::new()))
    }

    /// Canonical label
    pub fn as_str(&self) -> &str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Text => "text",
            FileKind::Word => "word",
            FileKind::Image => "image",
            FileKind::Excel => "excel",
            FileKind::Other(label) => label,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FileKind> for String {
    fn from(kind: FileKind) -> Self {
        kind.as_str().to_string()
    }
}

impl From<String> for FileKind {
    fn from(label: String) -> Self {
        FileKind::parse(&label)
    }
}
