//! HTTP client for Sonarr, Radarr and Lidarr.
//!
//! All three expose the same history API under a different version prefix,
//! so a single client covers them, parameterised by [`ArrKind`](crate::config::ArrKind).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ArrConfig;

use super::fuzzy::names_match;
use super::{ArrError, Consumer, HistoryRecord};

/// History fetched from the manager, reused until it goes stale.
#[derive(Debug)]
struct CachedHistory {
    fetched_at: Instant,
    records: Vec<HistoryRecord>,
}

/// Sonarr/Radarr/Lidarr client implementation.
pub struct ArrClient {
    client: Client,
    config: ArrConfig,
    history: RwLock<Option<CachedHistory>>,
}

impl ArrClient {
    /// Create a new client for the configured instance.
    pub fn new(config: ArrConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            history: RwLock::new(None),
        }
    }

    /// API base URL including the version prefix.
    fn api_url(&self) -> String {
        format!(
            "{}{}",
            self.config.url.trim_end_matches('/'),
            self.config.kind.api_prefix()
        )
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.history_cache_secs)
    }

    /// Fetch the most recent history page.
    async fn fetch_history(&self) -> Result<Vec<HistoryRecord>, ArrError> {
        let url = format!("{}/history", self.api_url());
        let page_size = self.config.history_page_size.to_string();

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.config.api_key)
            .query(&[
                ("page", "1"),
                ("pageSize", page_size.as_str()),
                ("sortKey", "date"),
                ("sortDirection", "descending"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArrError::Api(format!("HTTP {} fetching history", status)));
        }

        let page: HistoryPage = response.json().await?;
        debug!(
            arr = %self.config.name,
            records = page.records.len(),
            "Fetched history"
        );
        Ok(page.records)
    }

    /// Run `f` over fresh history, refreshing the cache when stale.
    ///
    /// A failed refresh falls back to stale records when there are any.
    async fn with_history<T>(
        &self,
        f: impl FnOnce(&[HistoryRecord]) -> T,
    ) -> Result<T, ArrError> {
        {
            let cache = self.history.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl() {
                    return Ok(f(&cached.records));
                }
            }
        }

        let mut cache = self.history.write().await;
        match self.fetch_history().await {
            Ok(records) => {
                let cached = cache.insert(CachedHistory {
                    fetched_at: Instant::now(),
                    records,
                });
                Ok(f(&cached.records))
            }
            Err(e) => match cache.as_ref() {
                Some(stale) => {
                    warn!(
                        arr = %self.config.name,
                        error = %e,
                        "History refresh failed, using stale history"
                    );
                    Ok(f(&stale.records))
                }
                None => Err(e),
            },
        }
    }

    /// Drop cached history so the next lookup refetches.
    async fn invalidate_history(&self) {
        *self.history.write().await = None;
    }
}

/// Paged history response.
#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    records: Vec<HistoryRecord>,
}

#[async_trait]
impl Consumer for ArrClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn history_contains(&self, candidate: &str) -> Result<Option<i64>, ArrError> {
        self.with_history(|records| {
            records
                .iter()
                .find(|record| names_match(&record.source_title, candidate))
                .map(|record| record.id)
        })
        .await
    }

    async fn mark_history_failed(&self, history_id: i64) -> Result<(), ArrError> {
        let url = format!("{}/history/failed/{}", self.api_url(), history_id);

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArrError::Api(format!(
                "HTTP {} marking history {} as failed",
                status, history_id
            )));
        }

        self.invalidate_history().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArrKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, kind: ArrKind) -> ArrClient {
        let mut config = ArrConfig::new("Test", kind, server.uri(), "arr-key");
        config.timeout_secs = 5;
        ArrClient::new(config)
    }

    fn history_body() -> serde_json::Value {
        json!({
            "page": 1,
            "pageSize": 250,
            "totalRecords": 2,
            "records": [
                {"id": 11, "sourceTitle": "Other.Release", "eventType": "grabbed"},
                {"id": 42, "sourceTitle": "Album_X", "eventType": "grabbed"}
            ]
        })
    }

    #[tokio::test]
    async fn test_history_contains_fuzzy_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/history"))
            .and(header("X-Api-Key", "arr-key"))
            .and(query_param("pageSize", "250"))
            .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
            .mount(&server)
            .await;

        let client = client_for(&server, ArrKind::Lidarr);
        assert_eq!(client.history_contains("Album X").await.unwrap(), Some(42));
        assert_eq!(client.history_contains("Unrelated").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_history_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, ArrKind::Sonarr);
        client.history_contains("Album X").await.unwrap();
        client.history_contains("Other Release").await.unwrap();
    }

    #[tokio::test]
    async fn test_history_error_without_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/history"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server, ArrKind::Radarr);
        let err = client.history_contains("Album X").await.unwrap_err();
        assert!(matches!(err, ArrError::Api(_)));
    }

    #[tokio::test]
    async fn test_stale_history_used_when_refresh_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/history"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut config = ArrConfig::new("Test", ArrKind::Sonarr, server.uri(), "arr-key");
        config.history_cache_secs = 0;
        let client = ArrClient::new(config);

        assert_eq!(client.history_contains("Album X").await.unwrap(), Some(42));
        // Cache is immediately stale and the refresh fails: stale records still answer.
        assert_eq!(client.history_contains("Album X").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_mark_history_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v3/history/failed/42"))
            .and(header("X-Api-Key", "arr-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, ArrKind::Radarr);
        client.mark_history_failed(42).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_history_failed_invalidates_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v3/history/failed/42"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server, ArrKind::Sonarr);
        client.history_contains("Album X").await.unwrap();
        client.mark_history_failed(42).await.unwrap();
        client.history_contains("Album X").await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_history_failed_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v3/history/failed/7"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server, ArrKind::Sonarr);
        assert!(client.mark_history_failed(7).await.is_err());
    }
}
