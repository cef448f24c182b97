//! Mapper module: schema-driven document decomposition
//!
//! Turns one raw, arbitrarily nested document payload into an ordered forest
//! of flat records linked by foreign keys, by interpreting the ADU tree at
//! run time. Mapping failures are always per-document and never retried.

mod record;
mod walk;

pub use record::{Record, RecordGraph, ScalarValue};
pub use walk::map_document;

use crate::schema::FieldType;
use thiserror::Error;

/// Schema/document mismatch during mapping
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("entity '{entity}': required field '{field}' is missing")]
    MissingField { entity: String, field: String },

    #[error("entity '{entity}', field '{field}': cannot represent {found} as {expected:?}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: FieldType,
        found: String,
    },

    #[error("entity '{entity}' at '{path}': expected {expected}, found {found}")]
    ShapeMismatch {
        entity: String,
        path: String,
        expected: String,
        found: String,
    },
}
