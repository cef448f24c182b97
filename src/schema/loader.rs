//! Schema file loading and validation
//!
//! A schema file is a TOML document with a `[document]` table describing the
//! ADU tree and an optional `[filter]` table carrying the collection-specific
//! search criteria that the source client forwards verbatim when listing
//! identifiers.

use crate::schema::types::AduNode;
use crate::schema::SchemaError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// A fully loaded per-use-case schema: the ADU tree plus search criteria
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    /// Root of the ADU tree
    pub document: AduNode,
    /// Search-filter parameters forwarded in the listing payload
    pub filter: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    document: AduNode,
    #[serde(default)]
    filter: Option<toml::Value>,
}

/// Loads and validates a schema description from a TOML file
pub fn load_schema(path: &Path) -> Result<DocumentSchema, SchemaError> {
    let content = std::fs::read_to_string(path)?;
    parse_schema(&content)
}

/// Parses and validates a schema description from TOML text
pub fn parse_schema(content: &str) -> Result<DocumentSchema, SchemaError> {
    let file: SchemaFile = toml::from_str(content)?;
    validate_node(&file.document)?;

    let filter = match file.filter {
        Some(value) => serde_json::to_value(value)
            .map_err(|e| SchemaError::Validation(format!("unrepresentable filter: {}", e)))?,
        None => serde_json::json!({}),
    };

    Ok(DocumentSchema {
        document: file.document,
        filter,
    })
}

/// Validates the ADU tree
///
/// Entity and field names must be safe SQL identifiers since they are spliced
/// into DDL and upsert statements. Entity names must be unique across the
/// tree (one table per entity), and every child node needs a source path.
fn validate_node(root: &AduNode) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();

    for node in root.iter_nodes() {
        check_identifier(&node.entity, "entity")?;
        if !seen.insert(node.entity.as_str()) {
            return Err(SchemaError::Validation(format!(
                "duplicate entity name '{}'",
                node.entity
            )));
        }

        for field in &node.fields {
            check_identifier(&field.name, "field")?;
            if field.name == "record_key" || field.name == "parent_key" {
                return Err(SchemaError::Validation(format!(
                    "field name '{}' is reserved (entity '{}')",
                    field.name, node.entity
                )));
            }
        }

        let mut field_names = HashSet::new();
        for field in &node.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(SchemaError::Validation(format!(
                    "duplicate field '{}' in entity '{}'",
                    field.name, node.entity
                )));
            }
        }

        for child in &node.children {
            if child.path.is_none() {
                return Err(SchemaError::Validation(format!(
                    "child entity '{}' has no path",
                    child.entity
                )));
            }
            if child.key_field.is_some() {
                return Err(SchemaError::Validation(format!(
                    "key-field is only valid on the root entity, found on '{}'",
                    child.entity
                )));
            }
        }
    }

    Ok(())
}

fn check_identifier(name: &str, kind: &str) -> Result<(), SchemaError> {
    let valid = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::Validation(format!(
            "{} name '{}' is not a valid identifier",
            kind, name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Cardinality, FieldType};

    const SAMPLE: &str = r#"
[filter]
nature = "DECRET"
fond = "JORF"

[document]
entity = "texts"

[[document.fields]]
name = "title"
path = "title"
type = "text"
required = true

[[document.fields]]
name = "publication_date"
path = "dateParution"
type = "timestamp"

[[document.children]]
entity = "articles"
path = "articles"
cardinality = "many"

[[document.children.fields]]
name = "content"
type = "text"
"#;

    #[test]
    fn test_parse_sample_schema() {
        let schema = parse_schema(SAMPLE).unwrap();

        assert_eq!(schema.document.entity, "texts");
        assert_eq!(schema.document.fields.len(), 2);
        assert_eq!(schema.document.fields[1].field_type, FieldType::Timestamp);
        assert_eq!(schema.document.children.len(), 1);

        let child = &schema.document.children[0];
        assert_eq!(child.entity, "articles");
        assert_eq!(child.cardinality, Cardinality::Many);
        assert_eq!(child.fields[0].source_path(), "content");

        assert_eq!(schema.filter["nature"], "DECRET");
        assert_eq!(schema.filter["fond"], "JORF");
    }

    #[test]
    fn test_missing_filter_defaults_to_empty_object() {
        let schema = parse_schema("[document]\nentity = \"texts\"\n").unwrap();
        assert!(schema.filter.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_duplicate_entities() {
        let content = r#"
[document]
entity = "texts"

[[document.children]]
entity = "texts"
path = "items"
"#;
        let err = parse_schema(content).unwrap_err();
        assert!(matches!(err, SchemaError::Validation(_)));
    }

    #[test]
    fn test_rejects_unsafe_identifier() {
        let content = "[document]\nentity = \"texts; DROP TABLE\"\n";
        assert!(parse_schema(content).is_err());
    }

    #[test]
    fn test_rejects_child_without_path() {
        let content = r#"
[document]
entity = "texts"

[[document.children]]
entity = "articles"
"#;
        assert!(parse_schema(content).is_err());
    }

    #[test]
    fn test_rejects_reserved_field_name() {
        let content = r#"
[document]
entity = "texts"

[[document.fields]]
name = "record_key"
"#;
        assert!(parse_schema(content).is_err());
    }
}
