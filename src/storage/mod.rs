//! Storage module: transactional relational persistence
//!
//! The database carries two kinds of tables: fixed bookkeeping tables (runs
//! and per-document outcomes), and entity tables generated from the ADU
//! schema. Entity tables are only ever created through an explicit
//! initialization step; ingestion runs refuse to alter the schema.

pub mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{StorageError, StorageResult, StorageWriter};

/// Status of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// Outcome recorded for one document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Ingested,
    Failed,
}

impl DocumentStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            DocumentStatus::Ingested => "ingested",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "ingested" => Some(DocumentStatus::Ingested),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// One row of the runs table
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}
