// Page fetch over reqwest.
// No custom headers, timeouts, or retries; the client defaults apply.

use async_trait::async_trait;
use pagecache::PageFetcher;
use reqwest::{Client, Response};
use shared::{Error, Result};

fn upstream_error(err: reqwest::Error) -> Error {
    Error::Upstream(err.to_string())
}

/// `PageFetcher` that GETs the URL and returns the response body as text.
#[derive(Clone, Debug, Default)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build().map_err(upstream_error)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Reject anything outside 2xx.
    async fn check_response(&self, url: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Upstream returned {} for '{}': {}", status, url, body);
        Err(Error::Upstream(format!("HTTP {status} for {url}")))
    }
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(upstream_error)?;

        self.check_response(url, response)
            .await?
            .text()
            .await
            .map_err(upstream_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use pagecache::{FALLBACK_BODY, FetchOutcome, PageCache};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage_engine::MokaStore;
    use tokio::net::TcpListener;

    /// Serves `/a` ("hello", counted) and `/fail` (500) on an ephemeral port
    async fn spawn_upstream() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let app = Router::new()
            .route(
                "/a",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        "hello"
                    }
                }),
            )
            .route(
                "/fail",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), hits)
    }

    /// Bypasses any proxy configured in the environment
    fn local_fetcher() -> ReqwestFetcher {
        ReqwestFetcher::with_client(Client::builder().no_proxy().build().unwrap())
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let (base, hits) = spawn_upstream().await;
        let fetcher = local_fetcher();

        let body = fetcher.fetch(&format!("{base}/a")).await.unwrap();

        assert_eq!(body, "hello");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_upstream_error() {
        let (base, _) = spawn_upstream().await;
        let fetcher = local_fetcher();

        let result = fetcher.fetch(&format!("{base}/fail")).await;

        match result {
            Err(Error::Upstream(message)) => assert!(message.contains("500")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_upstream_error() {
        // Grab a free port, then close it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = local_fetcher();
        let result = fetcher.fetch(&format!("http://{addr}/a")).await;

        assert!(matches!(result, Err(Error::Upstream(_))));
    }

    #[tokio::test]
    async fn test_cached_fetch_hits_upstream_once() {
        let (base, hits) = spawn_upstream().await;
        let url = format!("{base}/a");
        let cache = PageCache::new(
            Arc::new(MokaStore::new()),
            Arc::new(local_fetcher()),
        );

        let first = cache.get(&url).await.unwrap();
        let second = cache.get(&url).await.unwrap();

        assert_eq!(first, FetchOutcome::Fetched("hello".to_string()));
        assert_eq!(second, FetchOutcome::CacheHit("hello".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(cache.access_count(&url).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cached_fetch_failure_falls_back() {
        let (base, _) = spawn_upstream().await;
        let url = format!("{base}/fail");
        let cache = PageCache::new(
            Arc::new(MokaStore::new()),
            Arc::new(local_fetcher()),
        );

        assert_eq!(cache.get_or_fallback(&url).await, FALLBACK_BODY);
        assert!(matches!(cache.get(&url).await, Err(Error::Upstream(_))));
        assert_eq!(cache.access_count(&url).await.unwrap(), 2);
    }
}
