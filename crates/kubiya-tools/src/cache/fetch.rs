//! Fetch-or-cache orchestration

use bytes::Bytes;
use kubiya_core::KubiyaResult;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use super::{derive_key, CacheKey, FileCache, TimeBucket};

/// Identity and freshness policy of one cacheable request
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub operation: String,
    pub params: Vec<String>,
    pub ttl: Duration,
    pub bucket: TimeBucket,
    pub force_refresh: bool,
}

impl CacheRequest {
    pub fn new(operation: &str, ttl: Duration, bucket: TimeBucket) -> Self {
        Self {
            operation: operation.to_string(),
            params: Vec::new(),
            ttl,
            bucket,
            force_refresh: false,
        }
    }

    /// Append a parameter; `None` occupies its slot as an empty string
    pub fn param<S: AsRef<str>>(mut self, value: Option<S>) -> Self {
        self.params
            .push(value.map(|v| v.as_ref().to_string()).unwrap_or_default());
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Key for the current time bucket
    pub fn key(&self) -> CacheKey {
        derive_key(&self.operation, &self.params, &self.bucket.current())
    }
}

/// Where the returned bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Cache,
    Fetched,
}

/// Result of [`fetch_or_cache`]
#[derive(Debug, Clone)]
pub struct Cached {
    pub data: Bytes,
    pub source: CacheSource,
    pub key: CacheKey,
    /// Set when the entry was read from or written to disk
    pub path: Option<PathBuf>,
    /// Why a freshly fetched response could not be stored
    pub store_error: Option<String>,
}

impl Cached {
    pub fn from_cache(&self) -> bool {
        self.source == CacheSource::Cache
    }
}

/// Serve `request` from `cache` when fresh, otherwise call `fetch` and store
/// the result.
///
/// Storing is best effort: a write failure is logged and reported on the
/// returned [`Cached`], never propagated. A fetch failure is propagated as-is
/// and stale entries are never served in its place. Empty responses are
/// returned but not stored.
pub async fn fetch_or_cache<F, Fut>(
    cache: &FileCache,
    request: &CacheRequest,
    fetch: F,
) -> KubiyaResult<Cached>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = KubiyaResult<Bytes>>,
{
    let key = request.key();
    fetch_or_cache_with_key(cache, key, request.ttl, request.force_refresh, fetch).await
}

/// [`fetch_or_cache`] for a precomputed key
pub async fn fetch_or_cache_with_key<F, Fut>(
    cache: &FileCache,
    key: CacheKey,
    ttl: Duration,
    force_refresh: bool,
    fetch: F,
) -> KubiyaResult<Cached>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = KubiyaResult<Bytes>>,
{
    if force_refresh {
        debug!(key = %key, "Refresh requested, skipping cache lookup");
    } else {
        debug!(key = %key, "Checking cache");
        if let Some(data) = cache.get(&key, ttl).await {
            debug!(key = %key, bytes = data.len(), "Cache hit");
            let path = cache.path_for(&key);
            return Ok(Cached {
                data,
                source: CacheSource::Cache,
                key,
                path: Some(path),
                store_error: None,
            });
        }
    }

    debug!(key = %key, "Fetching");
    let data = match fetch().await {
        Ok(data) => data,
        Err(e) => {
            debug!(key = %key, error = %e, "Fetch failed");
            return Err(e);
        }
    };

    let (path, store_error) = if data.is_empty() {
        (None, None)
    } else {
        debug!(key = %key, "Caching");
        match cache.put(&key, &data).await {
            Ok(path) => (Some(path), None),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to cache response, continuing");
                (None, Some(e.to_string()))
            }
        }
    };

    debug!(key = %key, "Done");
    Ok(Cached {
        data,
        source: CacheSource::Fetched,
        key,
        path,
        store_error,
    })
}
