//! Run lifecycle, pipeline driver and capability persistence

use crate::chunking::TextChunker;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{ResultParser, ServiceRepair};
use crate::standardizer::Standardizer;
use crate::task::TaskClient;
use crate::types::{
    DocumentContext, ExtractionRequest, ExtractionResult, PersistFailure, PersistOutcome,
};
use capscan_domain::traits::{AnalysisService, ExtractionStore, TextSource};
use capscan_domain::{
    unix_now, AvailabilityStatus, Capability, CapabilityId, CapabilityType, Credentials,
    ExtractionRun, FileKind, InterfaceKind, Provenance, RawCapabilityRecord, RunSummary,
    RunUpdate,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Drives extraction runs and owns their bookkeeping
///
/// Every run is recorded in the store before any chunk is submitted and makes
/// exactly one terminal transition. Capabilities are only written by
/// [`ExtractionLedger::persist_capabilities`], which the caller invokes once
/// with the records of a completed run.
pub struct ExtractionLedger<A, S> {
    task_client: TaskClient<A>,
    store: Arc<Mutex<S>>,
    config: ExtractorConfig,
}

impl<A, S> ExtractionLedger<A, S>
where
    A: AnalysisService,
    S: ExtractionStore,
    S::Error: Display,
{
    /// Create a new ledger
    pub fn new(service: A, store: S, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        Self::with_shared(Arc::new(service), Arc::new(Mutex::new(store)), config)
    }

    /// Create a ledger over a service and store shared with other owners
    pub fn with_shared(
        service: Arc<A>,
        store: Arc<Mutex<S>>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        let task_client = TaskClient::from_arc(service)
            .with_service_guide_markers(config.service_guide_markers.clone());
        Ok(Self {
            task_client,
            store,
            config,
        })
    }

    /// Shared handle to the store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, S>, ExtractorError> {
        self.store
            .lock()
            .map_err(|e| ExtractorError::Store(format!("Store lock error: {}", e)))
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut S) -> Result<T, S::Error>,
    ) -> Result<T, ExtractorError> {
        let mut store = self.lock_store()?;
        f(&mut store).map_err(|e| ExtractorError::Store(e.to_string()))
    }

    /// Record a new run in `processing` state
    pub fn start_run(
        &self,
        filename: &str,
        file_kind: FileKind,
        application_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<ExtractionRun, ExtractorError> {
        let run = ExtractionRun::start(filename, file_kind, application_id, user_id, unix_now());
        self.with_store(|store| store.create_run(&run))?;
        info!("Started extraction run {} for '{}'", run.id, run.filename);
        Ok(run)
    }

    /// Run the pipeline over `text` and finalize `run`
    ///
    /// On success the run is `completed`; on any fatal error it is `failed`
    /// and the error is returned. Nothing is persisted either way.
    pub async fn run_extraction(
        &self,
        run: &mut ExtractionRun,
        text: &str,
        context: &DocumentContext,
        credentials: Option<&Credentials>,
    ) -> Result<ExtractionResult, ExtractorError> {
        let (records, chunks, raw_payloads) =
            match self.process(run, text, context, credentials).await {
                Ok(output) => output,
                Err(e) => {
                    self.fail_run(run, &e);
                    return Err(e);
                }
            };

        let summary = RunSummary {
            chunks,
            total_extracted: records.len(),
        };
        let snapshot = Value::Array(records.iter().cloned().map(|r| r.into_value()).collect());

        if let Err(e) = self.complete_run(run, summary, snapshot) {
            self.fail_run(run, &e);
            return Err(e);
        }

        info!(
            "Run {} completed: {} capabilities from {} chunks",
            run.id, summary.total_extracted, summary.chunks
        );

        Ok(ExtractionResult {
            run_id: run.id,
            total_count: records.len(),
            modules: count_areas(&records),
            capabilities: records,
            raw_result: raw_payloads.join("\n"),
        })
    }

    async fn process(
        &self,
        run: &mut ExtractionRun,
        text: &str,
        context: &DocumentContext,
        credentials: Option<&Credentials>,
    ) -> Result<(Vec<RawCapabilityRecord>, usize, Vec<String>), ExtractorError> {
        let chunks = TextChunker::new(self.config.max_chunk_size).chunk(text)?;
        info!(
            "Processing '{}' ({} chars) in {} chunks",
            context.filename,
            text.chars().count(),
            chunks.len()
        );

        let mut parser = ResultParser::local();
        if let Some(credentials) = credentials {
            parser = parser.with_strategy(ServiceRepair::new(
                &self.task_client,
                credentials,
                self.config.repair_poll,
            ));
        }

        let mut records = Vec::new();
        let mut raw_payloads = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            let handle = self
                .task_client
                .submit(&chunk.text, context, chunk.position(), credentials)
                .await?;

            if run.task_handle.is_none() {
                let update = RunUpdate::task_handle(handle.clone());
                let run_id = run.id;
                self.with_store(|store| store.update_run(run_id, &update))?;
                run.apply(&update);
            }

            let payload = self
                .task_client
                .wait_for_completion(&handle, self.config.chunk_poll)
                .await?;

            let chunk_records = parser.parse(&payload).await;
            info!(
                "Chunk {}/{} yielded {} records",
                chunk.index + 1,
                chunk.total,
                chunk_records.len()
            );
            records.extend(chunk_records);
            raw_payloads.push(payload);
        }

        let standardized = Standardizer::new(
            &self.task_client,
            self.config.standardize_threshold,
            self.config.standardize_poll,
            self.config.repair_poll,
        )
        .standardize(&records, credentials)
        .await;

        let records = if standardized.is_empty() {
            records
        } else {
            standardized
        };

        Ok((records, chunks.len(), raw_payloads))
    }

    fn complete_run(
        &self,
        run: &mut ExtractionRun,
        summary: RunSummary,
        snapshot: Value,
    ) -> Result<(), ExtractorError> {
        let update = run.complete(summary, snapshot, unix_now())?;
        let run_id = run.id;
        self.with_store(|store| store.update_run(run_id, &update))?;
        run.apply(&update);
        Ok(())
    }

    fn fail_run(&self, run: &mut ExtractionRun, cause: &ExtractorError) {
        let update = match run.fail(cause.to_string(), unix_now()) {
            Ok(update) => update,
            Err(e) => {
                warn!("Not marking run {} failed: {}", run.id, e);
                return;
            }
        };

        let run_id = run.id;
        match self.with_store(|store| store.update_run(run_id, &update)) {
            Ok(()) => {
                run.apply(&update);
                error!("Run {} failed: {}", run.id, cause);
            }
            Err(e) => error!("Could not record failure of run {}: {}", run.id, e),
        }
    }

    /// Pipeline entry point: read the document, run the pipeline, return records
    ///
    /// The returned records are not persisted; the caller passes them to
    /// [`ExtractionLedger::persist_capabilities`] exactly once.
    pub async fn extract_capabilities<T>(
        &self,
        request: &ExtractionRequest,
        text_source: &T,
    ) -> Result<ExtractionResult, ExtractorError>
    where
        T: TextSource,
    {
        let mut run = self.start_run(
            &request.filename,
            request.file_kind.clone(),
            request.application_id,
            request.user_id,
        )?;

        let text = match text_source
            .extract_text(&request.path, &request.file_kind)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                let err = ExtractorError::Document(format!("{}: {}", request.filename, e));
                self.fail_run(&mut run, &err);
                return Err(err);
            }
        };

        self.run_extraction(
            &mut run,
            &text,
            &request.context(),
            request.credentials.as_ref(),
        )
        .await
    }

    /// Map and store each record as a capability of `application_id`
    ///
    /// A record that cannot be mapped or stored is counted as failed and the
    /// loop continues.
    pub fn persist_capabilities(
        &self,
        application_id: i64,
        records: &[RawCapabilityRecord],
        provenance: &Provenance,
    ) -> Result<PersistOutcome, ExtractorError> {
        let mut outcome = PersistOutcome::default();
        let mut store = self.lock_store()?;
        let now = unix_now();

        for (index, record) in records.iter().enumerate() {
            let stored = map_record(record, application_id, provenance, &self.config, now)
                .and_then(|capability| {
                    store
                        .create_capability(&capability)
                        .map(|_| capability)
                        .map_err(|e| e.to_string())
                });

            match stored {
                Ok(capability) => {
                    outcome.success_count += 1;
                    outcome.saved.push(capability);
                }
                Err(reason) => {
                    warn!("Skipping record {}: {}", index, reason);
                    outcome.failed_count += 1;
                    outcome.failures.push(PersistFailure { index, reason });
                }
            }
        }

        info!(
            "Persisted {} capabilities for application {} ({} failed)",
            outcome.success_count, application_id, outcome.failed_count
        );
        Ok(outcome)
    }

    /// Runs ordered by start time, optionally for one application
    pub fn run_history(
        &self,
        application_id: Option<i64>,
    ) -> Result<Vec<ExtractionRun>, ExtractorError> {
        let store = self.lock_store()?;
        store
            .list_runs(application_id)
            .map_err(|e| ExtractorError::Store(e.to_string()))
    }
}

/// Collapse a raw record into the canonical schema
fn map_record(
    record: &RawCapabilityRecord,
    application_id: i64,
    provenance: &Provenance,
    config: &ExtractorConfig,
    extracted_at: u64,
) -> Result<Capability, String> {
    if record.is_empty() {
        return Err("record is empty".to_string());
    }

    let name = record
        .first_str(&["name", "webMethod", "methodName", "capabilityName"])
        .ok_or_else(|| "record has no name".to_string())?;

    let output_name = record.first_str(&["outputName"]);
    let output = record.first_str(&["output"]);
    let description = record.first_str(&["description"]).or_else(|| {
        if output_name.is_none() && output.is_none() {
            return None;
        }
        let text = format!(
            "{} - {}",
            output_name.as_deref().unwrap_or_default(),
            output.as_deref().unwrap_or_default()
        );
        Some(text.trim().to_string())
    });

    let status = match record.first_str(&["status"]) {
        Some(label) => AvailabilityStatus::parse(&label)
            .ok_or_else(|| format!("unknown status '{}'", label))?,
        None => AvailabilityStatus::default(),
    };

    let endpoint = record
        .first_str(&["endpoint", "webMethod"])
        .or_else(|| record.first_array_str("endpoints"));

    Ok(Capability {
        id: CapabilityId::new(),
        application_id,
        name,
        capability_type: record
            .first_str(&["type", "capabilityType"])
            .map(|t| CapabilityType::parse(&t))
            .unwrap_or(CapabilityType::Interface),
        area: record.first_str(&["area", "module"]),
        description,
        interface_kind: record
            .first_str(&["interfaceType", "type"])
            .map(|t| InterfaceKind::parse(&t)),
        protocol: record
            .first_str(&["protocol"])
            .unwrap_or_else(|| config.default_protocol.clone()),
        data_format: record
            .first_str(&["dataFormat"])
            .unwrap_or_else(|| config.default_data_format.clone()),
        endpoint,
        sample_request: record.first_str(&["sampleRequest"]),
        sample_response: record.first_str(&["sampleResponse", "outputName", "output"]),
        is_active: record.first_bool(&["isActive"]).unwrap_or(true),
        status,
        mapped_interface_id: None,
        provenance: provenance.clone(),
        extracted_at,
    })
}

fn count_areas(records: &[RawCapabilityRecord]) -> BTreeMap<String, usize> {
    let mut modules = BTreeMap::new();
    for area in records.iter().filter_map(|r| r.first_str(&["area", "module"])) {
        *modules.entry(area).or_insert(0) += 1;
    }
    modules
}
