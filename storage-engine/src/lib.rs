//! Key-value store adapters for the `pagecache` store port.

mod moka_store;
mod redis_store;

pub use moka_store::MokaStore;
pub use redis_store::RedisStore;
