//! Flat record types produced by the mapper and consumed by storage

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};

/// One scalar value extracted from a raw payload
///
/// `Absent` marks an optional field missing from the document — it is an
/// explicit value, never a silent zero, and maps to SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Absent,
}

impl ToSql for ScalarValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ScalarValue::Text(s) => ToSqlOutput::Borrowed(s.as_str().into()),
            ScalarValue::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            ScalarValue::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            ScalarValue::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            ScalarValue::Absent => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

/// One flattened row: entity, primary key, optional parent key, field values
///
/// Immutable after creation. Field pairs keep the schema's declaration order
/// so that mapping the same document twice produces identical records.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub entity: String,
    pub key: String,
    pub parent_key: Option<String>,
    pub fields: Vec<(String, ScalarValue)>,
}

impl Record {
    /// Value of a named field, if the record carries it
    pub fn field(&self, name: &str) -> Option<&ScalarValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// The ordered forest of records produced from one document
///
/// Parents always precede their children, which is the write order the
/// storage layer relies on for foreign-key integrity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordGraph {
    pub records: Vec<Record>,
}

impl RecordGraph {
    /// The root record of the document
    pub fn root(&self) -> Option<&Record> {
        self.records.first()
    }

    /// Records belonging to one entity, in traversal order
    pub fn by_entity<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Record> {
        self.records.iter().filter(move |r| r.entity == entity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
