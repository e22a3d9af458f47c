pub mod catalog;
pub mod counters;
pub mod error;
pub mod feed;
pub mod index;
pub mod ingest;
pub mod keys;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod store;
pub mod tokenizer;

pub use catalog::{CatalogEntry, CatalogWriter};
pub use counters::{CounterService, LikeOutcome};
pub use error::{CatalogError, Result};
pub use feed::FanInAggregator;
pub use index::{InvertedIndex, PruneReport};
pub use ingest::Ingestor;
pub use keys::Keyspace;
pub use model::{MediaKind, MediaRecord, RawHit};
pub use provider::{MediaProvider, SearchQuery};
pub use store::{Store, StoreHandle};

/// Current wall clock as epoch milliseconds.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
