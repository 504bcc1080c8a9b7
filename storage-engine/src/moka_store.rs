use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use moka::{Entry, Expiry};
use pagecache::KeyValueStore;
use shared::{Error, Result, TtlMs};
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// One slot of the keyspace: a counter or a body with its TTL
#[derive(Clone, Debug)]
enum StoredEntry {
    Counter(u64),
    Value { bytes: Bytes, ttl: Duration },
}

impl StoredEntry {
    fn ttl(&self) -> Option<Duration> {
        match self {
            StoredEntry::Counter(_) => None,
            StoredEntry::Value { ttl, .. } => Some(*ttl),
        }
    }
}

/// Expires each value after the TTL it was written with; overwriting restarts the clock.
/// Counters never expire.
struct PerEntryTtl;

impl Expiry<String, StoredEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl()
    }
}

fn not_an_integer(key: &str) -> Error {
    Error::Store(format!("value at '{key}' is not an integer or out of range"))
}

/// In-memory key-value store with Redis-like semantics: counters and
/// values share one keyspace, and writes to a key are serialised by
/// Moka's per-key compute lock.
pub struct MokaStore {
    entries: Cache<String, StoredEntry>,
}

impl MokaStore {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder()
                .name("pagecache-entries")
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MokaStore {
    async fn incr(&self, key: &str) -> Result<u64> {
        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|current| async move {
                match current.map(Entry::into_value) {
                    None => Op::Put(StoredEntry::Counter(1)),
                    Some(StoredEntry::Counter(count)) => match count.checked_add(1) {
                        Some(next) => Op::Put(StoredEntry::Counter(next)),
                        None => Op::Nop,
                    },
                    Some(StoredEntry::Value { .. }) => Op::Nop,
                }
            })
            .await;

        match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => {
                match entry.into_value() {
                    StoredEntry::Counter(count) => Ok(count),
                    StoredEntry::Value { .. } => Err(not_an_integer(key)),
                }
            }
            _ => Err(not_an_integer(key)),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        // None when the key never existed or its TTL expired
        Ok(self.entries.get(key).await.map(|entry| match entry {
            StoredEntry::Counter(count) => Bytes::from(count.to_string()),
            StoredEntry::Value { bytes, .. } => bytes,
        }))
    }

    async fn set_ex(&self, key: &str, value: Bytes, ttl: TtlMs) -> Result<()> {
        if ttl.0 == 0 {
            return Err(Error::Store(format!("invalid expire time for '{key}'")));
        }

        let entry = StoredEntry::Value {
            bytes: value,
            ttl: ttl.as_duration(),
        };
        self.entries
            .entry(key.to_string())
            .and_compute_with(|_| async move { Op::Put(entry) })
            .await;
        Ok(())
    }
}

impl Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}
