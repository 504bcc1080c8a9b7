use http_fetcher::ReqwestFetcher;
use pagecache::{KeyValueStore, PageCache};
use shared::config::{Config, StoreBackend};
use std::path::PathBuf;
use std::sync::Arc;
use storage_engine::{MokaStore, RedisStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (dotenv, filter) = load_env(dotenvy::dotenv);

    // Logs go to stderr, stdout carries page bodies only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();

    let store = init_store(&config.store).await?;
    let fetcher = Arc::new(ReqwestFetcher::new()?);
    let cache = PageCache::with_ttl(store, fetcher, config.result_ttl);

    info!(
        "Fetching {} {} time(s), results cached for {}ms",
        config.url, config.repeat, config.result_ttl.0
    );

    for _ in 0..config.repeat {
        println!("{}", cache.get_or_fallback(&config.url).await);
    }

    match cache.access_count(&config.url).await {
        Ok(count) => info!("'{}' has been requested {} time(s)", config.url, count),
        Err(e) => warn!("Could not read access count for '{}': {}", config.url, e),
    }

    Ok(())
}

/// Load environment variables from a .env file (if exists), then build the
/// log filter so a RUST_LOG set there takes effect.
fn load_env<F>(dotenv: F) -> (dotenvy::Result<PathBuf>, EnvFilter)
where
    F: FnOnce() -> dotenvy::Result<PathBuf>,
{
    let loaded = dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    (loaded, filter)
}

async fn init_store(backend: &StoreBackend) -> shared::Result<Arc<dyn KeyValueStore>> {
    match backend {
        StoreBackend::Redis(url) => {
            info!("Using Redis store at {}", url);
            Ok(Arc::new(RedisStore::connect(url).await?))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MokaStore::new()))
        }
    }
}
