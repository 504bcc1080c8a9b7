use crate::domain::{DEFAULT_RESULT_TTL, FALLBACK_BODY, FetchOutcome, keys};
use crate::ports::{KeyValueStore, PageFetcher};
use async_trait::async_trait;
use bytes::Bytes;
use shared::{Error, Result, TtlMs};
use std::sync::Arc;

/// Fetch-and-cache wrapper composed around a `PageFetcher`.
///
/// Every call bumps `count:<url>` before anything else, then serves
/// `result:<url>` when the store still holds it. On a miss the wrapped
/// fetcher is called and its body written back with the configured TTL.
/// Concurrent misses for the same URL are not deduplicated.
#[derive(Clone)]
pub struct PageCache {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn PageFetcher>,
    ttl: TtlMs,
}

impl PageCache {
    pub fn new(store: Arc<dyn KeyValueStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_ttl(store, fetcher, DEFAULT_RESULT_TTL)
    }

    pub fn with_ttl(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn PageFetcher>,
        ttl: TtlMs,
    ) -> Self {
        Self {
            store,
            fetcher,
            ttl,
        }
    }

    pub fn ttl(&self) -> TtlMs {
        self.ttl
    }

    /// Look up `url`, fetching and caching it on a miss. Store and
    /// upstream failures propagate unchanged.
    pub async fn get(&self, url: &str) -> Result<FetchOutcome> {
        let count = self.store.incr(&keys::count_key(url)).await?;
        tracing::debug!("Access #{} for '{}'", count, url);

        let result_key = keys::result_key(url);
        if let Some(cached) = self.store.get(&result_key).await? {
            let body = String::from_utf8(cached.to_vec())
                .map_err(|e| Error::Decode(format!("cached body for '{url}': {e}")))?;
            tracing::info!("Cache hit for '{}'", url);
            return Ok(FetchOutcome::CacheHit(body));
        }

        tracing::debug!("Cache miss for '{}', fetching upstream", url);
        let body = self.fetcher.fetch(url).await?;
        self.store
            .set_ex(&result_key, Bytes::from(body.clone()), self.ttl)
            .await?;

        Ok(FetchOutcome::Fetched(body))
    }

    pub async fn get_page(&self, url: &str) -> Result<String> {
        self.get(url).await.map(FetchOutcome::into_body)
    }

    /// Like `get_page`, but any failure is logged and replaced by
    /// `FALLBACK_BODY`.
    pub async fn get_or_fallback(&self, url: &str) -> String {
        match self.get_page(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to get '{}': {}", url, e);
                FALLBACK_BODY.to_string()
            }
        }
    }

    /// Number of times `url` has been requested. Reading it is not an access.
    pub async fn access_count(&self, url: &str) -> Result<u64> {
        let Some(raw) = self.store.get(&keys::count_key(url)).await? else {
            return Ok(0);
        };

        std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| Error::Decode(format!("access counter for '{url}' is not an integer")))
    }
}

#[async_trait]
impl PageFetcher for PageCache {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.get_page(url).await
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
