//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::CliConfig;
use crate::error::Result;
use crate::output::Formatter;
use capscan_analysis::HttpAnalysisService;
use capscan_domain::traits::{AnalysisService, ExtractionStore, TextSource};
use capscan_domain::{Credentials, FileKind, Provenance};
use capscan_extractor::{
    ExtractionLedger, ExtractionRequest, ExtractionResult, FileTextSource, PersistOutcome,
};
use capscan_store::SqliteStore;
use std::fmt::Display;
use std::path::Path;
use tracing::{info, warn};

/// What one extract invocation produced.
#[derive(Debug)]
pub struct ExtractReport {
    /// Pipeline result
    pub result: ExtractionResult,
    /// Persistence counts; `None` when no application was given
    pub outcome: Option<PersistOutcome>,
}

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &CliConfig,
    database: &Path,
    formatter: &Formatter,
) -> Result<()> {
    let service = HttpAnalysisService::new(config.analysis.clone())?;
    let store = SqliteStore::new(database)?;
    let ledger = ExtractionLedger::new(service, store, config.extractor.clone())?;

    let source = config
        .upload_dirs
        .iter()
        .fold(FileTextSource::new(), |source, dir| {
            source.with_search_dir(dir.clone())
        });

    let report = run_extract(&ledger, &source, &args).await?;
    println!(
        "{}",
        formatter.format_extraction(&report.result, report.outcome.as_ref())?
    );
    Ok(())
}

/// Run the pipeline for `args` and persist its records once.
///
/// With `--remove-source` the document is deleted whether the run succeeded
/// or failed.
pub async fn run_extract<A, S, T>(
    ledger: &ExtractionLedger<A, S>,
    source: &T,
    args: &ExtractArgs,
) -> Result<ExtractReport>
where
    A: AnalysisService,
    S: ExtractionStore,
    S::Error: Display,
    T: TextSource,
{
    let request = build_request(args);
    let extracted = ledger.extract_capabilities(&request, source).await;

    if args.remove_source {
        remove_source(&args.path).await;
    }

    let result = extracted?;
    let outcome = match request.application_id {
        Some(application_id) => {
            let provenance =
                Provenance::new(&request.filename, &ledger.config().extraction_method);
            Some(ledger.persist_capabilities(application_id, &result.capabilities, &provenance)?)
        }
        None => {
            info!("No application id given; {} records not persisted", result.total_count);
            None
        }
    };

    Ok(ExtractReport { result, outcome })
}

fn build_request(args: &ExtractArgs) -> ExtractionRequest {
    let filename = args
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.path.display().to_string());

    let credentials = match (&args.api_key, &args.username) {
        (Some(key), Some(user)) => Some(Credentials::new(key.clone(), user.clone())),
        _ => None,
    };

    ExtractionRequest {
        path: args.path.clone(),
        filename,
        file_kind: args
            .kind
            .map(FileKind::from)
            .unwrap_or_else(|| FileKind::from_path(&args.path)),
        application_id: args.app_id,
        application_name: args.app_name.clone(),
        user_id: args.user_id,
        credentials,
    }
}

async fn remove_source(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("Removed {}", path.display()),
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::KindArg;
    use crate::error::CliError;
    use capscan_analysis::MockAnalysisService;
    use capscan_extractor::{ExtractorConfig, ExtractorError, PollConfig};
    use std::path::PathBuf;

    fn args(path: PathBuf) -> ExtractArgs {
        ExtractArgs {
            path,
            kind: None,
            app_id: Some(3),
            app_name: Some("Orders".to_string()),
            user_id: None,
            api_key: Some("k".to_string()),
            username: Some("alice".to_string()),
            remove_source: true,
        }
    }

    fn ledger(service: MockAnalysisService) -> ExtractionLedger<MockAnalysisService, SqliteStore> {
        let fast = PollConfig::new(2, 1);
        let config = ExtractorConfig {
            chunk_poll: fast,
            standardize_poll: fast,
            repair_poll: fast,
            ..ExtractorConfig::default()
        };
        ExtractionLedger::new(service, SqliteStore::in_memory().unwrap(), config).unwrap()
    }

    #[test]
    fn test_build_request() {
        let mut a = args(PathBuf::from("uploads/guide.PDF"));
        let request = build_request(&a);
        assert_eq!(request.filename, "guide.PDF");
        assert_eq!(request.file_kind, FileKind::Pdf);
        assert!(request.credentials.is_some());

        a.kind = Some(KindArg::Text);
        a.username = None;
        let request = build_request(&a);
        assert_eq!(request.file_kind, FileKind::Text);
        assert!(request.credentials.is_none());
    }

    #[tokio::test]
    async fn test_extract_persists_once_and_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.txt");
        std::fs::write(&path, "createOrder places an order").unwrap();

        let ledger = ledger(MockAnalysisService::new(r#"[{"name": "createOrder"}]"#));
        let report = run_extract(&ledger, &FileTextSource::new(), &args(path.clone()))
            .await
            .unwrap();

        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.success_count, 1);
        assert!(!path.exists());

        let stored = ledger.store().lock().unwrap().list_capabilities(3).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].provenance.source_filename, "guide.txt");
    }

    #[tokio::test]
    async fn test_failed_run_still_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.txt");
        std::fs::write(&path, "text").unwrap();

        let mut a = args(path.clone());
        a.api_key = None;

        let ledger = ledger(MockAnalysisService::default());
        let err = run_extract(&ledger, &FileTextSource::new(), &a)
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Extractor(ExtractorError::Submission(_))));
        assert!(!path.exists());
        assert!(ledger.store().lock().unwrap().list_capabilities(3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_without_application_nothing_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.txt");
        std::fs::write(&path, "text").unwrap();

        let mut a = args(path.clone());
        a.app_id = None;
        a.remove_source = false;

        let ledger = ledger(MockAnalysisService::new(r#"[{"name": "createOrder"}]"#));
        let report = run_extract(&ledger, &FileTextSource::new(), &a)
            .await
            .unwrap();

        assert!(report.outcome.is_none());
        assert_eq!(report.result.total_count, 1);
        assert!(path.exists());
    }
}
