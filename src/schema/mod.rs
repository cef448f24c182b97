//! Schema description (abstract data unit) module
//!
//! The schema is data, not code: an externally supplied TOML file describes
//! how entities, fields, and nested sub-entities map between a raw document
//! payload and relational storage. The mapper and the storage writer both
//! interpret the same tree at run time.

mod loader;
mod types;

pub use loader::{load_schema, parse_schema, DocumentSchema};
pub use types::{AduNode, Cardinality, FieldSpec, FieldType};

use thiserror::Error;

/// Errors raised while loading a schema description
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse schema TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid schema: {0}")]
    Validation(String),
}
