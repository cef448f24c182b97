//! Document source module
//!
//! This module defines the interface to the remote document repository and
//! its two implementations: the authenticated, rate-limited API client and
//! the in-memory fake used in double mode. The orchestrator and the mapper
//! never branch on which one is active.

mod auth;
mod client;
mod fake;
mod retry;

pub use auth::{AccessToken, AuthProvider, OauthProvider};
pub use client::ApiSource;
pub use fake::FakeSource;
pub use retry::{with_retry, RetryPolicy};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a document source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network trouble, timeouts, rate-limit responses, 5xx. Retryable.
    #[error("transient source failure: {reason}")]
    Transient { reason: String },

    /// Auth failures and malformed requests or responses. Not retryable.
    #[error("fatal source failure: {reason}")]
    Fatal { reason: String },
}

impl SourceError {
    pub fn transient(reason: impl Into<String>) -> Self {
        SourceError::Transient {
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        SourceError::Fatal {
            reason: reason.into(),
        }
    }

    /// True if the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient { .. })
    }
}

/// Result type alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// One page of document identifiers
#[derive(Debug, Clone)]
pub struct Page {
    /// Identifiers in repository order
    pub ids: Vec<String>,
    /// Total result count reported by the source, when it reports one
    pub total: Option<u64>,
}

/// The raw payload of one document, read-only once fetched
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Source identifier (CID) of the document
    pub cid: String,
    /// Arbitrarily nested payload as returned by the source
    pub body: serde_json::Value,
}

/// A paginated document repository
///
/// Implemented by [`ApiSource`] for the real API and [`FakeSource`] for
/// double mode, with identical error semantics.
#[async_trait]
pub trait Source: Send + Sync {
    /// Lists one page of document identifiers. Pages are zero-based.
    async fn list_page(&self, page: u32, page_size: u32) -> SourceResult<Page>;

    /// Fetches the full payload of one document
    async fn fetch(&self, cid: &str) -> SourceResult<RawDocument>;
}

// Lets callers keep a handle on a source after handing it to the crawler
#[async_trait]
impl<S: Source + ?Sized> Source for std::sync::Arc<S> {
    async fn list_page(&self, page: u32, page_size: u32) -> SourceResult<Page> {
        (**self).list_page(page, page_size).await
    }

    async fn fetch(&self, cid: &str) -> SourceResult<RawDocument> {
        (**self).fetch(cid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SourceError::transient("timeout").is_transient());
        assert!(!SourceError::fatal("bad credentials").is_transient());
    }
}
