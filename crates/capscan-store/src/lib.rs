//! capscan Storage Layer
//!
//! Implements the `ExtractionStore` trait on SQLite.
//!
//! # Architecture
//!
//! - `extraction_runs`: one row per pipeline run, with JSON summary and snapshot
//! - `capabilities`: one row per persisted capability
//!
//! Terminal run transitions are guarded in SQL as well as in the domain type:
//! a `completed` or `failed` status is only written to a row that is still
//! `processing`.
//!
//! # Examples
//!
//! ```no_run
//! use capscan_store::SqliteStore;
//!
//! let store = SqliteStore::new("capscan.db").unwrap();
//! // Store is now ready for run and capability operations
//! ```

#![warn(missing_docs)]

use capscan_domain::traits::ExtractionStore;
use capscan_domain::{
    AvailabilityStatus, Capability, CapabilityId, CapabilityType, ExtractionRun, FileKind,
    InterfaceKind, Provenance, RunId, RunStatus, RunSummary, RunUpdate, TaskHandle,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Terminal transition on a run that already finished
    #[error("Invalid run transition: {0}")]
    Transition(String),
}

const RUN_COLUMNS: &str = "id, filename, file_kind, application_id, task_handle, status, \
     started_at, completed_at, summary, extracted_data, error, user_id";

const CAPABILITY_COLUMNS: &str = "id, application_id, capability_name, capability_type, area, \
     description, interface_type, protocol, data_format, endpoint, sample_request, \
     sample_response, is_active, status, mapped_interface_id, extracted_from, extracted_by, \
     extracted_date";

/// SQLite-based implementation of ExtractionStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share one store behind a mutex or
/// give each thread its own instance.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn id_to_bytes(value: u128) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    fn bytes_to_u128(bytes: &[u8]) -> Result<u128, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for id, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(u128::from_be_bytes(arr))
    }

    fn conversion_error(column: usize, kind: Type, e: StoreError) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(column, kind, Box::new(e))
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<ExtractionRun> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_u128(&id_bytes)
            .map(RunId::from_value)
            .map_err(|e| Self::conversion_error(0, Type::Blob, e))?;

        let status_str: String = row.get(5)?;
        let status = RunStatus::parse(&status_str).ok_or_else(|| {
            Self::conversion_error(
                5,
                Type::Text,
                StoreError::InvalidData(format!("Unknown run status: {}", status_str)),
            )
        })?;

        let summary: Option<String> = row.get(8)?;
        let summary = summary
            .map(|s| serde_json::from_str::<RunSummary>(&s))
            .transpose()
            .map_err(|e| Self::conversion_error(8, Type::Text, e.into()))?;

        let extracted: Option<String> = row.get(9)?;
        let extracted_data = extracted
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| Self::conversion_error(9, Type::Text, e.into()))?;

        let file_kind: String = row.get(2)?;
        let task_handle: Option<String> = row.get(4)?;
        let completed_at: Option<i64> = row.get(7)?;

        Ok(ExtractionRun {
            id,
            filename: row.get(1)?,
            file_kind: FileKind::parse(&file_kind),
            application_id: row.get(3)?,
            task_handle: task_handle.map(TaskHandle::new),
            status,
            started_at: row.get::<_, i64>(6)? as u64,
            completed_at: completed_at.map(|t| t as u64),
            summary,
            extracted_data,
            error: row.get(10)?,
            user_id: row.get(11)?,
        })
    }

    fn capability_from_row(row: &Row<'_>) -> rusqlite::Result<Capability> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_u128(&id_bytes)
            .map(CapabilityId::from_value)
            .map_err(|e| Self::conversion_error(0, Type::Blob, e))?;

        let status_str: String = row.get(13)?;
        let status = AvailabilityStatus::parse(&status_str).ok_or_else(|| {
            Self::conversion_error(
                13,
                Type::Text,
                StoreError::InvalidData(format!("Unknown capability status: {}", status_str)),
            )
        })?;

        let capability_type: String = row.get(3)?;
        let interface_type: Option<String> = row.get(6)?;

        Ok(Capability {
            id,
            application_id: row.get(1)?,
            name: row.get(2)?,
            capability_type: CapabilityType::parse(&capability_type),
            area: row.get(4)?,
            description: row.get(5)?,
            interface_kind: interface_type.map(|t| InterfaceKind::parse(&t)),
            protocol: row.get(7)?,
            data_format: row.get(8)?,
            endpoint: row.get(9)?,
            sample_request: row.get(10)?,
            sample_response: row.get(11)?,
            is_active: row.get(12)?,
            status,
            mapped_interface_id: row.get(14)?,
            provenance: Provenance::new(row.get::<_, String>(15)?, row.get::<_, String>(16)?),
            extracted_at: row.get::<_, i64>(17)? as u64,
        })
    }

    fn run_status(&self, id_bytes: &[u8]) -> Result<Option<RunStatus>, StoreError> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM extraction_runs WHERE id = ?1",
                params![id_bytes],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.and_then(|s| RunStatus::parse(&s)))
    }
}

impl ExtractionStore for SqliteStore {
    type Error = StoreError;

    fn create_run(&mut self, run: &ExtractionRun) -> Result<(), Self::Error> {
        let summary = run.summary.map(|s| serde_json::to_string(&s)).transpose()?;
        let extracted = run
            .extracted_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            &format!(
                "INSERT INTO extraction_runs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                RUN_COLUMNS
            ),
            params![
                Self::id_to_bytes(run.id.value()),
                &run.filename,
                run.file_kind.as_str(),
                run.application_id,
                run.task_handle.as_ref().map(|h| h.as_str()),
                run.status.as_str(),
                run.started_at as i64,
                run.completed_at.map(|t| t as i64),
                summary,
                extracted,
                &run.error,
                run.user_id,
            ],
        )?;

        debug!("Created run {} for '{}'", run.id, run.filename);
        Ok(())
    }

    fn update_run(&mut self, id: RunId, update: &RunUpdate) -> Result<(), Self::Error> {
        let id_bytes = Self::id_to_bytes(id.value());

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = update.status {
            assignments.push("status = ?");
            values.push(Box::new(status.as_str()));
        }
        if let Some(handle) = &update.task_handle {
            assignments.push("task_handle = ?");
            values.push(Box::new(handle.as_str().to_string()));
        }
        if let Some(completed_at) = update.completed_at {
            assignments.push("completed_at = ?");
            values.push(Box::new(completed_at as i64));
        }
        if let Some(summary) = update.summary {
            assignments.push("summary = ?");
            values.push(Box::new(serde_json::to_string(&summary)?));
        }
        if let Some(data) = &update.extracted_data {
            assignments.push("extracted_data = ?");
            values.push(Box::new(serde_json::to_string(data)?));
        }
        if let Some(error) = &update.error {
            assignments.push("error = ?");
            values.push(Box::new(error.clone()));
        }

        if assignments.is_empty() {
            return Ok(());
        }

        let terminal = update.status.map_or(false, |s| s.is_terminal());
        let mut sql = format!(
            "UPDATE extraction_runs SET {} WHERE id = ?",
            assignments.join(", ")
        );
        values.push(Box::new(id_bytes.clone()));
        if terminal {
            sql.push_str(" AND status = 'processing'");
        }

        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let changed = self.conn.execute(&sql, &param_refs[..])?;

        if changed == 0 {
            return match self.run_status(&id_bytes)? {
                None => Err(StoreError::NotFound(format!("run {}", id))),
                Some(current) => Err(StoreError::Transition(format!(
                    "run {} is already {}",
                    id, current
                ))),
            };
        }

        Ok(())
    }

    fn get_run(&self, id: RunId) -> Result<Option<ExtractionRun>, Self::Error> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM extraction_runs WHERE id = ?1", RUN_COLUMNS),
                params![Self::id_to_bytes(id.value())],
                Self::run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn list_runs(&self, application_id: Option<i64>) -> Result<Vec<ExtractionRun>, Self::Error> {
        let mut sql = format!("SELECT {} FROM extraction_runs", RUN_COLUMNS);
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(app) = application_id {
            sql.push_str(" WHERE application_id = ?");
            values.push(Box::new(app));
        }
        sql.push_str(" ORDER BY started_at, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let runs = stmt
            .query_map(&param_refs[..], Self::run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    fn create_capability(&mut self, capability: &Capability) -> Result<CapabilityId, Self::Error> {
        capability.validate().map_err(StoreError::InvalidData)?;

        self.conn.execute(
            &format!(
                "INSERT INTO capabilities ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                CAPABILITY_COLUMNS
            ),
            params![
                Self::id_to_bytes(capability.id.value()),
                capability.application_id,
                &capability.name,
                capability.capability_type.as_str(),
                &capability.area,
                &capability.description,
                capability.interface_kind.as_ref().map(|k| k.as_str()),
                &capability.protocol,
                &capability.data_format,
                &capability.endpoint,
                &capability.sample_request,
                &capability.sample_response,
                capability.is_active,
                capability.status.as_str(),
                capability.mapped_interface_id,
                &capability.provenance.source_filename,
                &capability.provenance.extraction_method,
                capability.extracted_at as i64,
            ],
        )?;

        Ok(capability.id)
    }

    fn list_capabilities(&self, application_id: i64) -> Result<Vec<Capability>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM capabilities WHERE application_id = ?1 ORDER BY id",
            CAPABILITY_COLUMNS
        ))?;
        let capabilities = stmt
            .query_map(params![application_id], Self::capability_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(capabilities)
    }
}
