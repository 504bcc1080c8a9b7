use async_trait::async_trait;
use bytes::Bytes;
use shared::{Result, TtlMs};

// Ports are the pluggable extension points for the external collaborators

/// Port for the key-value store holding counters and cached bodies
/// (e.g., Redis). Implementations report their failures as `Error::Store`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Increment the integer at `key`, creating it at 0 first, and return the new value
    async fn incr(&self, key: &str) -> Result<u64>;
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
    /// Store `value` under `key`, absent again once `ttl` has elapsed
    async fn set_ex(&self, key: &str, value: Bytes, ttl: TtlMs) -> Result<()>;
}

/// Port for the underlying page fetch. Implementations report their
/// failures as `Error::Upstream`.
#[async_trait]
pub trait PageFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<String>;
}
