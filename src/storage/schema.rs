//! SQL generation: bookkeeping schema and ADU-driven entity DDL

use crate::mapper::Record;
use crate::schema::AduNode;

/// Internal bookkeeping tables, created whenever the database is opened
pub const BOOKKEEPING_SQL: &str = r#"
-- Track ingestion runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Track the outcome per document identifier
CREATE TABLE IF NOT EXISTS documents (
    cid TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    updated_at TEXT NOT NULL,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
"#;

/// Builds the CREATE TABLE statement for one entity node
///
/// Every entity table carries the generated primary key and the parent
/// foreign key alongside the declared fields. Identifier safety is enforced
/// at schema load time.
pub fn create_table_sql(node: &AduNode) -> String {
    let mut columns = vec![
        "record_key TEXT PRIMARY KEY".to_string(),
        "parent_key TEXT".to_string(),
    ];
    for field in &node.fields {
        columns.push(format!("{} {}", field.name, field.field_type.sql_affinity()));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        node.entity,
        columns.join(",\n    ")
    )
}

/// Expected column list of an entity table, for shape checks
pub fn expected_columns(node: &AduNode) -> Vec<(String, String)> {
    let mut columns = vec![
        ("record_key".to_string(), "TEXT".to_string()),
        ("parent_key".to_string(), "TEXT".to_string()),
    ];
    for field in &node.fields {
        columns.push((field.name.clone(), field.field_type.sql_affinity().to_string()));
    }
    columns
}

/// Builds the upsert statement for one record
///
/// Keyed by `record_key`, so re-writing the same record is a no-op change.
pub fn upsert_sql(record: &Record) -> String {
    let mut columns = vec!["record_key", "parent_key"];
    columns.extend(record.fields.iter().map(|(name, _)| name.as_str()));

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = columns[1..]
        .iter()
        .map(|name| format!("{0} = excluded.{0}", name))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(record_key) DO UPDATE SET {}",
        record.entity,
        columns.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}
