use async_trait::async_trait;
use bytes::Bytes;
use pagecache::KeyValueStore;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use shared::{Error, Result, TtlMs};
use std::fmt::Debug;

fn store_error(err: redis::RedisError) -> Error {
    Error::Store(err.to_string())
}

/// Redis-backed store. One multiplexed connection is opened at startup
/// and shared by every command; the manager reconnects on its own.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to e.g. `redis://localhost:6379/0`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(store_error)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(store_error)?;

        tracing::info!("Connected to Redis at {}", url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn incr(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1u64).await.map_err(store_error)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(store_error)?;
        Ok(value.map(Bytes::from))
    }

    async fn set_ex(&self, key: &str, value: Bytes, ttl: TtlMs) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl.whole_secs() {
            Some(secs) => conn.set_ex::<_, _, ()>(key, &value[..], secs).await,
            None => conn.pset_ex::<_, _, ()>(key, &value[..], ttl.0).await,
        }
        .map_err(store_error)
    }
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("conn", &"<redis::aio::ConnectionManager>")
            .finish()
    }
}
