//! Depth-first decomposition of a raw document into a record graph
//!
//! The walk follows the ADU tree in lock-step with the corresponding
//! sub-structure of the payload: scalar fields are extracted by source path
//! and coerced to their declared type, child nodes recurse once per captured
//! value, and every child record carries its parent's primary key.

use crate::mapper::record::{Record, RecordGraph, ScalarValue};
use crate::mapper::MappingError;
use crate::schema::{AduNode, Cardinality, FieldType};
use crate::source::RawDocument;
use serde_json::Value;

/// Decomposes one fetched document according to the schema tree
///
/// Deterministic: mapping the same document against the same schema twice
/// produces identical graphs, including generated child keys. Child keys are
/// derived from the parent key, the child entity, and (for "many" children)
/// the element's original index.
pub fn map_document(doc: &RawDocument, schema: &AduNode) -> Result<RecordGraph, MappingError> {
    let root_key = match &schema.key_field {
        Some(field) => match lookup(&doc.body, field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(MappingError::MissingField {
                    entity: schema.entity.clone(),
                    field: field.clone(),
                })
            }
        },
        None => doc.cid.clone(),
    };

    let mut graph = RecordGraph::default();
    walk(schema, &doc.body, root_key, None, &mut graph)?;
    Ok(graph)
}

fn walk(
    node: &AduNode,
    value: &Value,
    key: String,
    parent_key: Option<String>,
    graph: &mut RecordGraph,
) -> Result<(), MappingError> {
    let mut fields = Vec::with_capacity(node.fields.len());
    for spec in &node.fields {
        let raw = lookup(value, spec.source_path());
        let scalar = match raw {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(MappingError::MissingField {
                        entity: node.entity.clone(),
                        field: spec.name.clone(),
                    });
                }
                ScalarValue::Absent
            }
            Some(v) => coerce(v, spec.field_type).ok_or_else(|| MappingError::TypeMismatch {
                entity: node.entity.clone(),
                field: spec.name.clone(),
                expected: spec.field_type,
                found: describe(v),
            })?,
        };
        fields.push((spec.name.clone(), scalar));
    }

    graph.records.push(Record {
        entity: node.entity.clone(),
        key: key.clone(),
        parent_key,
        fields,
    });

    for child in &node.children {
        let path = child.path.as_deref().unwrap_or(&child.entity);
        match (lookup(value, path), child.cardinality) {
            // Absent child: zero records, not an error
            (None, _) | (Some(Value::Null), _) => {}
            (Some(Value::Array(items)), Cardinality::Many) => {
                for (index, item) in items.iter().enumerate() {
                    let child_key = format!("{}:{}:{}", key, child.entity, index);
                    walk(child, item, child_key, Some(key.clone()), graph)?;
                }
            }
            (Some(found), Cardinality::Many) => {
                return Err(MappingError::ShapeMismatch {
                    entity: child.entity.clone(),
                    path: path.to_string(),
                    expected: "array".to_string(),
                    found: describe(found),
                });
            }
            (Some(Value::Array(_)), Cardinality::One) => {
                return Err(MappingError::ShapeMismatch {
                    entity: child.entity.clone(),
                    path: path.to_string(),
                    expected: "single value".to_string(),
                    found: "array".to_string(),
                });
            }
            (Some(item), Cardinality::One) => {
                let child_key = format!("{}:{}", key, child.entity);
                walk(child, item, child_key, Some(key.clone()), graph)?;
            }
        }
    }

    Ok(())
}

/// Resolves a dotted path inside a payload; numeric segments index arrays
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Coerces a raw JSON value to the declared target type when safely
/// representable; returns None otherwise
fn coerce(value: &Value, target: FieldType) -> Option<ScalarValue> {
    match target {
        FieldType::Text => match value {
            Value::String(s) => Some(ScalarValue::Text(s.clone())),
            Value::Number(n) => Some(ScalarValue::Text(n.to_string())),
            Value::Bool(b) => Some(ScalarValue::Text(b.to_string())),
            _ => None,
        },
        FieldType::Integer => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ScalarValue::Integer(i))
                } else {
                    // Integer-valued floats are safe; anything else is not
                    let f = n.as_f64()?;
                    (f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .then_some(ScalarValue::Integer(f as i64))
                }
            }
            Value::String(s) => s.trim().parse::<i64>().ok().map(ScalarValue::Integer),
            _ => None,
        },
        FieldType::Real => match value {
            Value::Number(n) => n.as_f64().map(ScalarValue::Real),
            Value::String(s) => s.trim().parse::<f64>().ok().map(ScalarValue::Real),
            _ => None,
        },
        FieldType::Bool => match value {
            Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            Value::String(s) => match s.as_str() {
                "true" => Some(ScalarValue::Bool(true)),
                "false" => Some(ScalarValue::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        FieldType::Timestamp => match value {
            // Epoch integers: the repository reports milliseconds
            Value::Number(n) => {
                let raw = n.as_i64()?;
                Some(ScalarValue::Integer(from_epoch(raw)))
            }
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| ScalarValue::Integer(dt.timestamp())),
            _ => None,
        },
    }
}

/// Normalizes an epoch value to seconds
///
/// The repository reports publication dates in epoch milliseconds; values
/// that large are divided down, plausible second-resolution values pass
/// through unchanged.
fn from_epoch(raw: i64) -> i64 {
    const MILLIS_THRESHOLD: i64 = 100_000_000_000; // ~ year 5138 in seconds
    if raw.abs() >= MILLIS_THRESHOLD {
        raw / 1000
    } else {
        raw
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}
