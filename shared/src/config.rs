use crate::TtlMs;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis(String), // connection url
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub url: String,
    pub repeat: u32,
    pub store: StoreBackend,
    pub result_ttl: TtlMs,
}

impl Config {
    const DEFAULT_URL: &str = "http://slowwly.dayoonasanya.com";
    const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
    const DEFAULT_REPEAT: u32 = 2;
    const DEFAULT_TTL_SECS: u64 = 10;
    // Largest TTL that still fits in milliseconds
    const MAX_TTL_SECS: u64 = u64::MAX / 1000;

    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let repeat = match lookup("PAGECACHE_REPEAT").map(|v| v.parse::<u32>()) {
            None => Self::DEFAULT_REPEAT,
            Some(Ok(repeat)) => repeat,
            Some(Err(_)) => {
                warn!(
                    "PAGECACHE_REPEAT must be a non-negative integer, using {}",
                    Self::DEFAULT_REPEAT
                );
                Self::DEFAULT_REPEAT
            }
        };

        let ttl_secs = match lookup("PAGECACHE_TTL_SECS").map(|v| v.parse::<u64>()) {
            None => Self::DEFAULT_TTL_SECS,
            Some(Ok(secs)) if secs > 0 && secs <= Self::MAX_TTL_SECS => secs,
            Some(_) => {
                warn!(
                    "PAGECACHE_TTL_SECS must be between 1 and {}, using {}s",
                    Self::MAX_TTL_SECS,
                    Self::DEFAULT_TTL_SECS
                );
                Self::DEFAULT_TTL_SECS
            }
        };

        let redis_url = lookup("PAGECACHE_REDIS_URL")
            .unwrap_or_else(|| Self::DEFAULT_REDIS_URL.to_string());
        let store = match lookup("PAGECACHE_STORE").as_deref().map(str::trim) {
            None | Some("redis") => StoreBackend::Redis(redis_url),
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                warn!("Unknown PAGECACHE_STORE '{}', falling back to redis", other);
                StoreBackend::Redis(redis_url)
            }
        };

        Self {
            url: lookup("PAGECACHE_URL").unwrap_or_else(|| Self::DEFAULT_URL.to_string()),
            repeat,
            store,
            result_ttl: TtlMs::from_secs(ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.url, "http://slowwly.dayoonasanya.com");
        assert_eq!(config.repeat, 2);
        assert_eq!(
            config.store,
            StoreBackend::Redis("redis://localhost:6379/0".to_string())
        );
        assert_eq!(config.result_ttl, TtlMs(10_000));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PAGECACHE_URL", "http://example.test/a"),
            ("PAGECACHE_REPEAT", "5"),
            ("PAGECACHE_STORE", "memory"),
            ("PAGECACHE_TTL_SECS", "30"),
        ]);
        assert_eq!(config.url, "http://example.test/a");
        assert_eq!(config.repeat, 5);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.result_ttl, TtlMs(30_000));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("PAGECACHE_STORE", "memcached"),
            ("PAGECACHE_REDIS_URL", "redis://cache:6380/1"),
            ("PAGECACHE_TTL_SECS", "0"),
            ("PAGECACHE_REPEAT", "lots"),
        ]);
        assert_eq!(
            config.store,
            StoreBackend::Redis("redis://cache:6380/1".to_string())
        );
        assert_eq!(config.result_ttl, TtlMs(10_000));
        assert_eq!(config.repeat, 2);
    }

    #[test]
    fn test_oversized_ttl_falls_back() {
        let config = config_from(&[("PAGECACHE_TTL_SECS", "18446744073709552")]);
        assert_eq!(config.result_ttl, TtlMs(10_000));

        let largest = (u64::MAX / 1000).to_string();
        let config = config_from(&[("PAGECACHE_TTL_SECS", largest.as_str())]);
        assert_eq!(config.result_ttl, TtlMs::from_secs(u64::MAX / 1000));
    }
}
