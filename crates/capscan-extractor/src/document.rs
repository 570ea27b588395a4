//! Reading uploaded documents as plain text

use async_trait::async_trait;
use capscan_domain::traits::TextSource;
use capscan_domain::FileKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading a document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// No candidate location holds the file
    #[error("File not found: {0}")]
    NotFound(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document kind cannot be turned into text
    #[error("Unsupported document: {0}")]
    Unsupported(String),

    /// PDF text extraction failed
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Reads documents from the local filesystem
///
/// Relative paths that do not exist as given are looked up by filename in
/// each search directory, in order.
#[derive(Debug, Clone, Default)]
pub struct FileTextSource {
    search_dirs: Vec<PathBuf>,
}

impl FileTextSource {
    /// Create a source without search directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to look in for relative paths
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    async fn resolve(&self, path: &Path) -> Result<PathBuf, DocumentError> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(path.to_path_buf());
        }

        if path.is_relative() {
            for dir in &self.search_dirs {
                let candidate = dir.join(path);
                if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                    return Ok(candidate);
                }
            }
        }

        Err(DocumentError::NotFound(path.display().to_string()))
    }
}

#[async_trait]
impl TextSource for FileTextSource {
    type Error = DocumentError;

    async fn extract_text(&self, path: &Path, kind: &FileKind) -> Result<String, Self::Error> {
        let resolved = self.resolve(path).await?;
        debug!("Reading {} document from {}", kind, resolved.display());

        match kind {
            FileKind::Pdf => read_pdf(resolved).await,
            FileKind::Word => Err(DocumentError::Unsupported(
                "Word documents must be converted to PDF or text first".to_string(),
            )),
            _ => {
                let bytes = tokio::fs::read(&resolved).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

#[cfg(feature = "pdf")]
async fn read_pdf(path: PathBuf) -> Result<String, DocumentError> {
    let bytes = tokio::fs::read(&path).await?;
    // pdf-extract is CPU-bound
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| DocumentError::Pdf(format!("Task join error: {}", e)))?
        .map_err(|e| DocumentError::Pdf(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
async fn read_pdf(path: PathBuf) -> Result<String, DocumentError> {
    Err(DocumentError::Unsupported(format!(
        "{}: PDF support requires the `pdf` feature",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_text_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "getOrder returns an order").unwrap();

        let text = FileTextSource::new()
            .extract_text(file.path(), &FileKind::Text)
            .await
            .unwrap();
        assert_eq!(text, "getOrder returns an order");
    }

    #[tokio::test]
    async fn test_relative_path_found_in_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("guide.txt"), "body").unwrap();

        let source = FileTextSource::new()
            .with_search_dir(dir.path().join("missing"))
            .with_search_dir(dir.path());
        let text = source
            .extract_text(Path::new("guide.txt"), &FileKind::Text)
            .await
            .unwrap();
        assert_eq!(text, "body");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = FileTextSource::new()
            .extract_text(Path::new("/nonexistent/capscan/doc.txt"), &FileKind::Text)
            .await;
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_word_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = FileTextSource::new()
            .extract_text(file.path(), &FileKind::Word)
            .await;
        assert!(matches!(result, Err(DocumentError::Unsupported(_))));
    }
}
