//! Sequential crawl orchestration
//!
//! The coordinator drives one ingestion run: list a page of identifiers,
//! then fetch, map and write each document in turn before asking for the
//! next page. One document is in flight at a time; the rate ceiling on the
//! remote API makes anything faster pointless.

use crate::crawler::report::{FailedDocument, IngestReport};
use crate::crawler::CancelFlag;
use crate::mapper::map_document;
use crate::schema::DocumentSchema;
use crate::source::{with_retry, RetryPolicy, Source};
use crate::storage::{SqliteStorage, StorageWriter};
use std::time::Duration;

/// Drives one ingestion run over a document source
pub struct Coordinator<S: Source> {
    source: S,
    storage: SqliteStorage,
    schema: DocumentSchema,
    page_size: u32,
    retry: RetryPolicy,
    cancel: CancelFlag,
}

impl<S: Source> Coordinator<S> {
    pub fn new(source: S, storage: SqliteStorage, schema: DocumentSchema, page_size: u32) -> Self {
        Self {
            source,
            storage,
            schema,
            page_size: page_size.max(1),
            retry: RetryPolicy::new(3, Duration::from_millis(500)),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs a full crawl and returns the outcome summary
    ///
    /// A listing failure aborts the run; per-document failures are recorded
    /// and the crawl moves on to the next identifier.
    pub async fn run(mut self, config_hash: &str) -> crate::Result<IngestReport> {
        let run_id = self.storage.create_run(config_hash)?;
        tracing::info!("Starting ingestion run {}", run_id);

        let mut report = IngestReport::default();
        let mut page = 0u32;
        let mut seen = 0u64;

        'crawl: loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping before page {}", page);
                break;
            }

            let listing = with_retry(&self.retry, || {
                self.source.list_page(page, self.page_size)
            })
            .await;

            let listing = match listing {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::error!("Listing page {} failed, aborting run: {}", page, e);
                    self.storage.fail_run(run_id)?;
                    return Err(e.into());
                }
            };

            report.pages_listed += 1;
            let count = listing.ids.len();
            seen += count as u64;
            tracing::debug!("Page {}: {} identifiers", page, count);

            for cid in &listing.ids {
                if self.cancel.is_cancelled() {
                    tracing::info!("Cancellation requested, stopping mid-page");
                    break 'crawl;
                }
                self.process_document(cid, run_id, &mut report).await?;
            }

            if count == 0 || (count as u32) < self.page_size {
                break;
            }
            if let Some(total) = listing.total {
                if seen >= total {
                    break;
                }
            }
            page += 1;
        }

        self.storage.complete_run(run_id)?;
        tracing::info!(
            "Run {} finished: {} ingested, {} skipped, {} failed",
            run_id,
            report.ingested,
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }

    /// Fetches, maps and writes one document
    ///
    /// Failures here are scoped to the single document: they are recorded in
    /// the bookkeeping table and reflected in the report, and the crawl
    /// continues. Only storage-level bookkeeping errors propagate.
    async fn process_document(
        &mut self,
        cid: &str,
        run_id: i64,
        report: &mut IngestReport,
    ) -> crate::Result<()> {
        if self.storage.is_ingested(cid)? {
            tracing::debug!("Skipping '{}', already ingested", cid);
            report.skipped += 1;
            return Ok(());
        }

        let doc = match with_retry(&self.retry, || self.source.fetch(cid)).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Fetching '{}' failed: {}", cid, e);
                return self.note_failure(cid, run_id, &e.to_string(), report);
            }
        };

        let graph = match map_document(&doc, &self.schema.document) {
            Ok(graph) => graph,
            Err(e) => {
                tracing::warn!("Mapping '{}' failed: {}", cid, e);
                return self.note_failure(cid, run_id, &e.to_string(), report);
            }
        };

        if let Err(e) = self.storage.write(&graph) {
            tracing::warn!("Writing '{}' failed: {}", cid, e);
            return self.note_failure(cid, run_id, &e.to_string(), report);
        }

        self.storage.mark_ingested(cid, run_id)?;
        report.ingested += 1;
        tracing::debug!("Ingested '{}' ({} records)", cid, graph.len());
        Ok(())
    }

    fn note_failure(
        &mut self,
        cid: &str,
        run_id: i64,
        reason: &str,
        report: &mut IngestReport,
    ) -> crate::Result<()> {
        self.storage.record_failure(cid, run_id, reason)?;
        report.failed.push(FailedDocument {
            cid: cid.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }
}
