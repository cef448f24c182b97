use serde::Deserialize;

/// One node of the abstract-data-unit tree.
///
/// A node describes a single logical entity: the table it maps to, the scalar
/// fields extracted from the raw payload, and the nested sub-entities below
/// it. The same tree is read by the mapper (source paths) and by the storage
/// writer (entity names, field names, target types), which keeps the document
/// layout and the table layout in one description.
#[derive(Debug, Clone, Deserialize)]
pub struct AduNode {
    /// Entity name; becomes the backing table name
    pub entity: String,

    /// Field whose value becomes the primary key of the root record.
    /// When absent, the document identifier is used.
    #[serde(rename = "key-field", default)]
    pub key_field: Option<String>,

    /// Location of this node's value inside the parent payload.
    /// Meaningful on child nodes only; ignored at the root.
    #[serde(default)]
    pub path: Option<String>,

    /// One value or a list of values at `path`. Child nodes only.
    #[serde(default)]
    pub cardinality: Cardinality,

    /// Scalar fields, in declaration order
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Nested sub-entities, in declaration order
    #[serde(default)]
    pub children: Vec<AduNode>,
}

/// One scalar field of an entity
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    /// Column name in the backing table
    pub name: String,

    /// Dotted path inside the raw payload; numeric segments index arrays.
    /// Defaults to `name`.
    #[serde(default)]
    pub path: Option<String>,

    /// Target type the raw value is coerced to
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Required fields abort mapping of the whole document when missing;
    /// optional fields map to an explicit absent value.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// Source path of this field, falling back to the field name
    pub fn source_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// How many values a child node captures from its parent payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

/// Target type of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Integer,
    Real,
    Bool,
    /// Stored as Unix seconds; accepts epoch integers or RFC 3339 strings
    Timestamp,
}

impl FieldType {
    /// SQLite column affinity for this type
    pub fn sql_affinity(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Integer | FieldType::Timestamp | FieldType::Bool => "INTEGER",
            FieldType::Real => "REAL",
        }
    }
}

impl AduNode {
    /// Iterates over this node and all its descendants, parents first
    pub fn iter_nodes(&self) -> Vec<&AduNode> {
        let mut nodes = vec![self];
        let mut i = 0;
        while i < nodes.len() {
            let children: Vec<&AduNode> = nodes[i].children.iter().collect();
            nodes.extend(children);
            i += 1;
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_nodes_parents_first() {
        let node = AduNode {
            entity: "root".to_string(),
            key_field: None,
            path: None,
            cardinality: Cardinality::One,
            fields: vec![],
            children: vec![AduNode {
                entity: "child".to_string(),
                key_field: None,
                path: Some("items".to_string()),
                cardinality: Cardinality::Many,
                fields: vec![],
                children: vec![AduNode {
                    entity: "grandchild".to_string(),
                    key_field: None,
                    path: Some("parts".to_string()),
                    cardinality: Cardinality::Many,
                    fields: vec![],
                    children: vec![],
                }],
            }],
        };

        let names: Vec<&str> = node.iter_nodes().iter().map(|n| n.entity.as_str()).collect();
        assert_eq!(names, vec!["root", "child", "grandchild"]);
    }

    #[test]
    fn test_field_source_path_defaults_to_name() {
        let field = FieldSpec {
            name: "title".to_string(),
            path: None,
            field_type: FieldType::Text,
            required: false,
        };
        assert_eq!(field.source_path(), "title");
    }

    #[test]
    fn test_sql_affinity() {
        assert_eq!(FieldType::Text.sql_affinity(), "TEXT");
        assert_eq!(FieldType::Timestamp.sql_affinity(), "INTEGER");
        assert_eq!(FieldType::Real.sql_affinity(), "REAL");
    }
}
