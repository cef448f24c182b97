//! Lexloom: a schema-driven legal-document ingestion engine
//!
//! This crate crawls a legal-document repository API page by page, fetches
//! full document payloads, decomposes each payload into flat, foreign-key
//! linked records according to an externally supplied schema description,
//! and upserts the records transactionally into SQLite.

pub mod config;
pub mod crawler;
pub mod mapper;
pub mod schema;
pub mod source;
pub mod storage;

use thiserror::Error;

/// Main error type for lexloom operations
#[derive(Debug, Error)]
pub enum LoomError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] schema::SchemaError),

    #[error("Source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] mapper::MappingError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for lexloom operations
pub type Result<T> = std::result::Result<T, LoomError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelFlag, Coordinator, IngestReport};
pub use mapper::{map_document, Record, RecordGraph, ScalarValue};
pub use schema::{AduNode, Cardinality, DocumentSchema, FieldSpec, FieldType};
pub use source::{FakeSource, Page, RawDocument, Source, SourceError};
pub use storage::{SqliteStorage, StorageWriter};
