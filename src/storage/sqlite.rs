//! SQLite storage implementation

use crate::mapper::RecordGraph;
use crate::schema::AduNode;
use crate::storage::schema::{create_table_sql, expected_columns, upsert_sql, BOOKKEEPING_SQL};
use crate::storage::traits::{StorageError, StorageResult, StorageWriter};
use crate::storage::{DocumentStatus, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at the given path
    ///
    /// The internal bookkeeping tables are created here; entity tables are
    /// only created by [`StorageWriter::init_entities`].
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        conn.execute_batch(BOOKKEEPING_SQL)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(BOOKKEEPING_SQL)?;
        Ok(Self { conn })
    }

    fn table_exists(&self, name: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Compares an existing table's columns against the schema description
    fn check_shape(&self, node: &AduNode) -> StorageResult<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", node.entity))?;
        let actual: Vec<(String, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?.to_uppercase(),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let expected = expected_columns(node);
        if actual != expected {
            return Err(StorageError::SchemaConflict {
                entity: node.entity.clone(),
                detail: format!("expected columns {:?}, found {:?}", expected, actual),
            });
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        Ok(())
    }
}

impl StorageWriter for SqliteStorage {
    fn init_entities(&mut self, schema: &AduNode) -> StorageResult<()> {
        for node in schema.iter_nodes() {
            if self.table_exists(&node.entity)? {
                // A matching table is fine; an incompatible one aborts, but
                // tables created earlier in this walk stay in place.
                self.check_shape(node)?;
                tracing::debug!("Entity table '{}' already present", node.entity);
            } else {
                self.conn.execute_batch(&create_table_sql(node))?;
                tracing::info!("Created entity table '{}'", node.entity);
            }
        }
        Ok(())
    }

    fn entities_ready(&self, schema: &AduNode) -> StorageResult<bool> {
        for node in schema.iter_nodes() {
            if !self.table_exists(&node.entity)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn write(&mut self, graph: &RecordGraph) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for record in &graph.records {
            let sql = upsert_sql(record);
            let mut stmt = tx.prepare_cached(&sql)?;

            let mut values: Vec<&dyn rusqlite::types::ToSql> =
                Vec::with_capacity(record.fields.len() + 2);
            values.push(&record.key);
            values.push(&record.parent_key);
            for (_, value) in &record.fields {
                values.push(value);
            }
            stmt.execute(values.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed)
    }

    fn fail_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
        )?;

        stmt.query_row(params![run_id], |row| {
            Ok(RunRecord {
                id: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                config_hash: row.get(3)?,
                status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                    .unwrap_or(RunStatus::Running),
            })
        })
        .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn mark_ingested(&mut self, cid: &str, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO documents (cid, status, run_id, updated_at, error_message)
             VALUES (?1, ?2, ?3, ?4, NULL)
             ON CONFLICT(cid) DO UPDATE SET
                 status = excluded.status,
                 run_id = excluded.run_id,
                 updated_at = excluded.updated_at,
                 error_message = NULL",
            params![cid, DocumentStatus::Ingested.to_db_string(), run_id, now],
        )?;
        Ok(())
    }

    fn record_failure(&mut self, cid: &str, run_id: i64, reason: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO documents (cid, status, run_id, updated_at, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(cid) DO UPDATE SET
                 status = excluded.status,
                 run_id = excluded.run_id,
                 updated_at = excluded.updated_at,
                 error_message = excluded.error_message",
            params![cid, DocumentStatus::Failed.to_db_string(), run_id, now, reason],
        )?;
        Ok(())
    }

    fn is_ingested(&self, cid: &str) -> StorageResult<bool> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM documents WHERE cid = ?1",
                params![cid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.as_deref() == Some(DocumentStatus::Ingested.to_db_string()))
    }

    fn count_documents(&self, status: DocumentStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_entity_rows(&self, entity: &str) -> StorageResult<u64> {
        if !self.table_exists(entity)? {
            return Ok(0);
        }
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", entity), [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }
}
