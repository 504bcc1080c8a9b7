#![deny(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{FALLBACK_BODY, FetchOutcome};
pub use ports::{KeyValueStore, PageFetcher};
pub use service::PageCache;
