//! Crawler module: run orchestration
//!
//! Ties the source, the mapper and the storage layer together into a
//! sequential ingestion run, with cooperative cancellation and a final
//! summary report.

mod coordinator;
mod report;

pub use coordinator::Coordinator;
pub use report::{FailedDocument, IngestReport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation handle
///
/// Checked between documents; an in-flight document always finishes, so the
/// database is never left with a half-written record graph.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
