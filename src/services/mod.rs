//! Services for fetching, ranking, caching and lookup

pub mod aggregator;
pub mod fetcher;
pub mod lookup;
pub mod pipeline;
pub mod resolver;
pub mod store;

pub use aggregator::Aggregator;
pub use fetcher::{CollectionSource, Fetcher};
pub use lookup::{RankingLookup, DEFAULT_TOP_K};
pub use pipeline::{Pipeline, RunReport};
pub use resolver::{CategoryResolver, HttpCategoryResolver};
pub use store::{FileStore, KeyValueStore, MemoryStore, RankingStore, RedisStore};
