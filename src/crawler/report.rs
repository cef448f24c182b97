//! Crawl outcome summary

use std::fmt;

/// One document that could not be ingested
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDocument {
    pub cid: String,
    pub reason: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Pages of identifiers requested from the source
    pub pages_listed: u32,
    /// Documents fetched, mapped and written this run
    pub ingested: u64,
    /// Documents skipped because an earlier run already ingested them
    pub skipped: u64,
    /// Documents that failed, with per-document reasons
    pub failed: Vec<FailedDocument>,
}

impl IngestReport {
    pub fn total_seen(&self) -> u64 {
        self.ingested + self.skipped + self.failed.len() as u64
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ingestion complete: {} documents seen across {} pages",
            self.total_seen(),
            self.pages_listed
        )?;
        writeln!(f, "  ingested: {}", self.ingested)?;
        writeln!(f, "  skipped:  {}", self.skipped)?;
        writeln!(f, "  failed:   {}", self.failed.len())?;
        for failure in &self.failed {
            writeln!(f, "    {}: {}", failure.cid, failure.reason)?;
        }
        Ok(())
    }
}
