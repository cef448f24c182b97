//! Real API client
//!
//! Talks to the remote document repository over authenticated POST requests:
//! a paginated search endpoint returning identifiers and a consult endpoint
//! returning one full document payload. Every call waits on the client's own
//! rate limiter and carries a bearer token; a 401 triggers one token refresh
//! and exactly one retry of the call before the failure is surfaced as fatal.

use crate::config::SourceConfig;
use crate::source::{AuthProvider, Page, RawDocument, Source, SourceError, SourceResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Minimum-interval rate limiter shared by all calls of one client
struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(requests_per_minute: u32) -> Self {
        Self {
            min_interval: Duration::from_secs(60) / requests_per_minute.max(1),
            last_request: Mutex::new(None),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Authenticated client for the real document-repository API
pub struct ApiSource {
    client: reqwest::Client,
    auth: Arc<dyn AuthProvider>,
    base_url: String,
    search_path: String,
    consult_path: String,
    filter: Value,
    limiter: RateLimiter,
}

/// Response of the search endpoint
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "totalResultNumber")]
    total_result_number: u64,
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    titles: Vec<TitleRef>,
}

#[derive(Debug, Deserialize)]
struct TitleRef {
    cid: String,
}

impl ApiSource {
    /// Creates a client from the source configuration and a search filter
    ///
    /// The filter comes from the document schema and is forwarded verbatim
    /// inside the search payload.
    pub fn new(
        config: &SourceConfig,
        filter: Value,
        auth: Arc<dyn AuthProvider>,
    ) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SourceError::fatal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_path: config.search_path.clone(),
            consult_path: config.consult_path.clone(),
            filter,
            limiter: RateLimiter::new(config.requests_per_minute),
        })
    }

    /// Sends one authenticated POST, refreshing the token once on 401
    async fn post_json(&self, path: &str, payload: &Value) -> SourceResult<Value> {
        self.limiter.wait().await;

        let token = self.auth.token().await?;
        let response = self.send(path, payload, &token.secret).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("Token rejected for {}, refreshing once", path);
            let token = self.auth.refresh().await?;
            // The resend is an API call like any other
            self.limiter.wait().await;
            self.send(path, payload, &token.secret).await?
        } else {
            response
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::fatal(format!(
                "authentication rejected for {} (HTTP {})",
                path, status
            )));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(SourceError::transient(format!(
                "{} returned HTTP {}",
                path, status
            )));
        }
        if !status.is_success() {
            return Err(SourceError::fatal(format!(
                "{} returned HTTP {}",
                path, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::fatal(format!("malformed response from {}: {}", path, e)))
    }

    async fn send(
        &self,
        path: &str,
        payload: &Value,
        bearer: &str,
    ) -> SourceResult<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(bearer)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::transient(format!("request to {} timed out", path))
                } else if e.is_connect() {
                    SourceError::transient(format!("connection to {} failed: {}", path, e))
                } else {
                    SourceError::fatal(format!("request to {} failed: {}", path, e))
                }
            })
    }
}

#[async_trait]
impl Source for ApiSource {
    async fn list_page(&self, page: u32, page_size: u32) -> SourceResult<Page> {
        // The repository numbers pages from 1
        let mut search = self.filter.clone();
        if !search.is_object() {
            search = json!({});
        }
        search["pageNumber"] = json!(page + 1);
        search["pageSize"] = json!(page_size);
        let payload = json!({ "recherche": search });

        let body = self.post_json(&self.search_path, &payload).await?;
        let parsed: SearchResponse = serde_json::from_value(body)
            .map_err(|e| SourceError::fatal(format!("malformed search response: {}", e)))?;

        let ids = parsed
            .results
            .into_iter()
            .filter_map(|hit| hit.titles.into_iter().next().map(|t| t.cid))
            .collect();

        Ok(Page {
            ids,
            total: Some(parsed.total_result_number),
        })
    }

    async fn fetch(&self, cid: &str) -> SourceResult<RawDocument> {
        let payload = json!({ "textCid": cid });
        let body = self.post_json(&self.consult_path, &payload).await?;
        Ok(RawDocument {
            cid: cid.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_spaces_calls() {
        // 1200 rpm -> 50ms minimum interval
        let limiter = RateLimiter::new(1200);
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_rate_limiter_first_call_is_immediate() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.min_interval, Duration::from_secs(60));
    }
}
