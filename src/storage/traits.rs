//! Storage traits and error types

use crate::mapper::RecordGraph;
use crate::schema::AduNode;
use crate::storage::{DocumentStatus, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// An existing table's shape contradicts the schema description.
    /// Fatal to schema initialization only; tables created before the
    /// conflict stay in place.
    #[error("schema conflict on entity '{entity}': {detail}")]
    SchemaConflict { entity: String, detail: String },

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for the relational storage backend
///
/// DDL (entity-table creation) happens only through `init_entities`; normal
/// ingestion runs only issue DML through `write` and the bookkeeping methods.
pub trait StorageWriter {
    // ===== Schema management =====

    /// Creates each declared entity's backing table if absent
    ///
    /// Idempotent: safe to call repeatedly. Fails with
    /// [`StorageError::SchemaConflict`] if an existing table has an
    /// incompatible column list; tables created before the conflict remain.
    fn init_entities(&mut self, schema: &AduNode) -> StorageResult<()>;

    /// Checks that every entity table declared by the schema exists
    fn entities_ready(&self, schema: &AduNode) -> StorageResult<bool>;

    // ===== Document writes =====

    /// Persists a whole record graph in one transaction
    ///
    /// Records are upserted in graph order (parents before children); either
    /// the whole document's records land, or none do.
    fn write(&mut self, graph: &RecordGraph) -> StorageResult<()>;

    // ===== Run management =====

    /// Creates a new ingestion run and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Marks a run as failed with a finish timestamp
    fn fail_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Gets a run by id
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    // ===== Document bookkeeping =====

    /// Records a successfully ingested document
    fn mark_ingested(&mut self, cid: &str, run_id: i64) -> StorageResult<()>;

    /// Records a per-document failure with its reason
    fn record_failure(&mut self, cid: &str, run_id: i64, reason: &str) -> StorageResult<()>;

    /// True if the document has already been ingested in any run
    fn is_ingested(&self, cid: &str) -> StorageResult<bool>;

    /// Counts documents in the given status
    fn count_documents(&self, status: DocumentStatus) -> StorageResult<u64>;

    /// Counts rows currently stored for one entity table
    fn count_entity_rows(&self, entity: &str) -> StorageResult<u64>;
}
