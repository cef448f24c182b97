//! In-memory document source for double mode
//!
//! Serves identifier pages and document payloads from memory with the same
//! contract and error semantics as the real API, so the rest of the engine
//! cannot tell the difference. Supports failure injection for exercising the
//! per-document error paths without a network.

use crate::source::{Page, RawDocument, Source, SourceError, SourceResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Fake document repository
#[derive(Default)]
pub struct FakeSource {
    ids: Vec<String>,
    docs: HashMap<String, Value>,
    broken: HashMap<String, String>,
    list_calls: AtomicU32,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document; listing order follows insertion order
    pub fn push_document(&mut self, cid: impl Into<String>, body: Value) {
        let cid = cid.into();
        self.ids.push(cid.clone());
        self.docs.insert(cid, body);
    }

    /// Makes fetching the given identifier fail fatally with `reason`
    pub fn break_document(&mut self, cid: impl Into<String>, reason: impl Into<String>) {
        self.broken.insert(cid.into(), reason.into());
    }

    /// Number of `list_page` calls served so far
    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// A small deterministic legal corpus matching `schema.sample.toml`
    pub fn sample() -> Self {
        let mut source = Self::new();
        for n in 1..=7 {
            let cid = format!("JORFTEXT{:012}", n);
            source.push_document(
                cid.clone(),
                json!({
                    "cid": cid,
                    "title": format!("Décret no 2021-{} portant avancement", n),
                    "nature": "DECRET",
                    "dateParution": 1_609_459_200_000i64 + (n as i64) * 86_400_000,
                    "articles": (1..=3).map(|a| json!({
                        "num": a.to_string(),
                        "content": format!("Article {} du décret {}.", a, n),
                        "etat": "VIGUEUR",
                    })).collect::<Vec<_>>(),
                }),
            );
        }
        source
    }
}

#[async_trait]
impl Source for FakeSource {
    async fn list_page(&self, page: u32, page_size: u32) -> SourceResult<Page> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let start = (page as usize) * (page_size as usize);
        let end = (start + page_size as usize).min(self.ids.len());
        let ids = if start >= self.ids.len() {
            Vec::new()
        } else {
            self.ids[start..end].to_vec()
        };

        Ok(Page {
            ids,
            total: Some(self.ids.len() as u64),
        })
    }

    async fn fetch(&self, cid: &str) -> SourceResult<RawDocument> {
        if let Some(reason) = self.broken.get(cid) {
            return Err(SourceError::fatal(reason.clone()));
        }
        match self.docs.get(cid) {
            Some(body) => Ok(RawDocument {
                cid: cid.to_string(),
                body: body.clone(),
            }),
            None => Err(SourceError::fatal(format!("unknown identifier '{}'", cid))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_page_slices_in_order() {
        let mut source = FakeSource::new();
        for n in 0..5 {
            source.push_document(format!("CID{}", n), json!({}));
        }

        let page = source.list_page(0, 2).await.unwrap();
        assert_eq!(page.ids, vec!["CID0", "CID1"]);
        assert_eq!(page.total, Some(5));

        let page = source.list_page(2, 2).await.unwrap();
        assert_eq!(page.ids, vec!["CID4"]);

        let page = source.list_page(3, 2).await.unwrap();
        assert!(page.ids.is_empty());

        assert_eq!(source.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_returns_payload() {
        let mut source = FakeSource::new();
        source.push_document("CID1", json!({"title": "t"}));

        let doc = source.fetch("CID1").await.unwrap();
        assert_eq!(doc.cid, "CID1");
        assert_eq!(doc.body["title"], "t");
    }

    #[tokio::test]
    async fn test_broken_document_fails_fatally() {
        let mut source = FakeSource::new();
        source.push_document("CID1", json!({}));
        source.break_document("CID1", "boom");

        let err = source.fetch("CID1").await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unknown_cid_is_fatal() {
        let source = FakeSource::new();
        assert!(source.fetch("NOPE").await.is_err());
    }

    #[tokio::test]
    async fn test_sample_corpus_is_deterministic() {
        let a = FakeSource::sample();
        let b = FakeSource::sample();
        let doc_a = a.fetch("JORFTEXT000000000003").await.unwrap();
        let doc_b = b.fetch("JORFTEXT000000000003").await.unwrap();
        assert_eq!(doc_a.body, doc_b.body);
        assert_eq!(doc_a.body["articles"].as_array().unwrap().len(), 3);
    }
}
