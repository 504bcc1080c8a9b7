use shared::TtlMs;

/// Body returned by the guarded lookup when anything goes wrong
pub const FALLBACK_BODY: &str = "Error fetching the URL";

pub const DEFAULT_RESULT_TTL: TtlMs = TtlMs::from_secs(10);

pub mod keys {
    pub const COUNT_PREFIX: &str = "count:";
    pub const RESULT_PREFIX: &str = "result:";

    /// Key of the per-URL access counter
    pub fn count_key(url: &str) -> String {
        format!("{COUNT_PREFIX}{url}")
    }

    /// Key of the cached response body
    pub fn result_key(url: &str) -> String {
        format!("{RESULT_PREFIX}{url}")
    }
}

/// Where a page body came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Cache miss, the upstream fetcher was called and the body stored
    Fetched(String),
    /// Served from the store without touching the network
    CacheHit(String),
}

impl FetchOutcome {
    pub fn body(&self) -> &str {
        match self {
            FetchOutcome::Fetched(body) | FetchOutcome::CacheHit(body) => body,
        }
    }

    pub fn into_body(self) -> String {
        match self {
            FetchOutcome::Fetched(body) | FetchOutcome::CacheHit(body) => body,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, FetchOutcome::CacheHit(_))
    }
}
