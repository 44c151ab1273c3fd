//! Loading of external stylesheets
//!
//! URL resolution, scheme-dispatched fetchers and the shared stylesheet cache.

pub mod cache;
pub mod fetcher;
pub mod resolver;

pub use cache::{CacheKey, CacheStats, StylesheetCache};
pub use fetcher::{DEFAULT_TIMEOUT, FileFetcher, Fetcher, HttpFetcher, NoFetcher};
pub use resolver::{StylesheetResolver, StylesheetSource};
