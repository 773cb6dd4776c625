//! Response cache with TTL expiry
//!
//! Tools that read slow-changing vendor data (application lists, clusters,
//! datasets) keep raw responses on a shared volume so repeated calls within a
//! short window skip the network:
//!
//! 1. [`derive_key`] hashes the operation, its parameters, and a coarse time
//!    bucket into a file name.
//! 2. [`FileCache`] serves an entry while `now - mtime < ttl`.
//! 3. [`fetch_or_cache`] ties the two together around a fetch closure.
//!
//! Entries are only removed by explicit maintenance
//! ([`FileCache::invalidate_older_than`], [`FileCache::clear`]).

mod fetch;
mod key;
mod store;

pub use fetch::{fetch_or_cache, fetch_or_cache_with_key, CacheRequest, CacheSource, Cached};
pub use key::{derive_key, CacheKey, TimeBucket};
pub use store::{CacheFileInfo, CacheStats, FileCache};
