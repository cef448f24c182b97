//! End-to-end ingestion tests over the fake source
//!
//! These drive the full coordinator loop (list, fetch, map, write) against
//! the in-memory fake repository and a real on-disk SQLite database.

use lexloom::schema::{parse_schema, DocumentSchema};
use lexloom::source::RetryPolicy;
use lexloom::storage::{DocumentStatus, SqliteStorage, StorageWriter};
use lexloom::{CancelFlag, Coordinator, FakeSource};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const CORPUS_SCHEMA: &str = r#"
[document]
entity = "texts"
key-field = "cid"

[[document.fields]]
name = "title"
type = "text"
required = true

[[document.fields]]
name = "nature"
type = "text"

[[document.fields]]
name = "publication_date"
path = "dateParution"
type = "timestamp"

[[document.children]]
entity = "articles"
path = "articles"
cardinality = "many"

[[document.children.fields]]
name = "num"
type = "text"

[[document.children.fields]]
name = "content"
type = "text"

[[document.children.fields]]
name = "etat"
type = "text"
"#;

fn corpus_schema() -> DocumentSchema {
    parse_schema(CORPUS_SCHEMA).expect("corpus schema parses")
}

fn prepared_storage(path: &Path, schema: &DocumentSchema) -> SqliteStorage {
    let mut storage = SqliteStorage::open(path).expect("open database");
    storage
        .init_entities(&schema.document)
        .expect("create entity tables");
    storage
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(1))
}

#[tokio::test]
async fn test_full_ingest_of_sample_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ingest.db");
    let schema = corpus_schema();
    let storage = prepared_storage(&db_path, &schema);

    let source = Arc::new(FakeSource::sample());
    let report = Coordinator::new(Arc::clone(&source), storage, schema, 3)
        .with_retry(fast_retry())
        .run("hash")
        .await
        .expect("crawl completes");

    assert_eq!(report.ingested, 7);
    assert_eq!(report.skipped, 0);
    assert!(report.failed.is_empty());
    // 7 ids at page size 3: pages of 3, 3, 1; the short page terminates
    assert_eq!(source.list_calls(), 3);
    assert_eq!(report.pages_listed, 3);

    let reopened = SqliteStorage::open(&db_path).unwrap();
    assert_eq!(reopened.count_entity_rows("texts").unwrap(), 7);
    assert_eq!(reopened.count_entity_rows("articles").unwrap(), 21);
    assert_eq!(
        reopened.count_documents(DocumentStatus::Ingested).unwrap(),
        7
    );
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ingest.db");
    let schema = corpus_schema();
    let storage = prepared_storage(&db_path, &schema);

    let mut source = FakeSource::new();
    for n in 1..=5 {
        let cid = format!("CID{}", n);
        source.push_document(
            cid.clone(),
            json!({
                "cid": cid,
                "title": format!("Texte {}", n),
                "articles": [{"num": "1", "content": "corps", "etat": "VIGUEUR"}],
            }),
        );
    }
    source.break_document("CID3", "consult endpoint rejected the request");

    let report = Coordinator::new(source, storage, schema, 10)
        .with_retry(fast_retry())
        .run("hash")
        .await
        .unwrap();

    assert_eq!(report.ingested, 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].cid, "CID3");
    assert!(report.failed[0].reason.contains("consult endpoint"));

    let reopened = SqliteStorage::open(&db_path).unwrap();
    assert_eq!(reopened.count_entity_rows("texts").unwrap(), 4);
    assert_eq!(reopened.count_documents(DocumentStatus::Failed).unwrap(), 1);
    assert!(!reopened.is_ingested("CID3").unwrap());
    assert!(reopened.is_ingested("CID4").unwrap());
}

#[tokio::test]
async fn test_termination_after_short_page() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ingest.db");
    let schema = corpus_schema();
    let storage = prepared_storage(&db_path, &schema);

    let mut source = FakeSource::new();
    for n in 0..34 {
        source.push_document(
            format!("CID{:03}", n),
            json!({"title": format!("Texte {}", n)}),
        );
    }
    let source = Arc::new(source);

    let report = Coordinator::new(Arc::clone(&source), storage, schema, 10)
        .with_retry(fast_retry())
        .run("hash")
        .await
        .unwrap();

    // Pages of 10, 10, 10, 4: the final short page ends the crawl
    assert_eq!(source.list_calls(), 4);
    assert_eq!(report.pages_listed, 4);
    assert_eq!(report.ingested, 34);
}

#[tokio::test]
async fn test_rerun_skips_already_ingested() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ingest.db");
    let schema = corpus_schema();

    let storage = prepared_storage(&db_path, &schema);
    let first = Coordinator::new(FakeSource::sample(), storage, schema.clone(), 10)
        .with_retry(fast_retry())
        .run("hash")
        .await
        .unwrap();
    assert_eq!(first.ingested, 7);

    let storage = SqliteStorage::open(&db_path).unwrap();
    let second = Coordinator::new(FakeSource::sample(), storage, schema, 10)
        .with_retry(fast_retry())
        .run("hash")
        .await
        .unwrap();

    assert_eq!(second.ingested, 0);
    assert_eq!(second.skipped, 7);
    assert!(second.failed.is_empty());

    let reopened = SqliteStorage::open(&db_path).unwrap();
    assert_eq!(reopened.count_entity_rows("texts").unwrap(), 7);
    assert_eq!(reopened.count_entity_rows("articles").unwrap(), 21);
}

#[tokio::test]
async fn test_mapping_failure_is_recorded_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ingest.db");
    let schema = corpus_schema();
    let storage = prepared_storage(&db_path, &schema);

    let mut source = FakeSource::new();
    source.push_document("GOOD", json!({"title": "Texte complet"}));
    // Missing the required title
    source.push_document("BAD", json!({"nature": "DECRET"}));

    let report = Coordinator::new(source, storage, schema, 10)
        .with_retry(fast_retry())
        .run("hash")
        .await
        .unwrap();

    assert_eq!(report.ingested, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].cid, "BAD");
    assert!(report.failed[0].reason.contains("title"));
}

#[tokio::test]
async fn test_cancellation_before_start_ingests_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ingest.db");
    let schema = corpus_schema();
    let storage = prepared_storage(&db_path, &schema);

    let cancel = CancelFlag::new();
    cancel.cancel();

    let source = Arc::new(FakeSource::sample());
    let report = Coordinator::new(Arc::clone(&source), storage, schema, 10)
        .with_cancel(cancel)
        .run("hash")
        .await
        .unwrap();

    assert_eq!(report.ingested, 0);
    assert_eq!(source.list_calls(), 0);
}
