//! Concurrent multi-language feed fetching.
//!
//! Sources are partitioned by language into independent bounded worker
//! pools; one slow or broken feed never blocks the others. Per-source
//! failures become structured results, not errors.

mod error;
mod feed;
mod pool;
mod types;

pub use error::FetchError;
pub use feed::{fetch_feed, parse_feed};
pub use pool::{fetch_all_sources, FetchOptions};
pub use types::{FeedItem, FetchReport, FetchSource, LanguageFetchStats, SourceFetchResult};
