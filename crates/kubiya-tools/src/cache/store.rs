//! File-backed response store
//!
//! Entries are plain files named `<prefix>_<digest>.json` inside one cache
//! directory. Freshness comes from the file modification time; nothing else
//! is recorded. There is no locking: concurrent writers to the same key race
//! and the last write wins.

use bytes::Bytes;
use kubiya_core::{KubiyaError, KubiyaResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use super::CacheKey;

/// Window used by [`CacheStats::recent`]
const RECENT_WINDOW: Duration = Duration::from_secs(3600);

/// Cache rooted at a single directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

/// One file in the cache directory
#[derive(Debug, Clone, Serialize)]
pub struct CacheFileInfo {
    pub name: String,
    pub size: u64,
    #[serde(with = "system_time_secs")]
    pub modified: SystemTime,
}

/// Aggregate view of the cache directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub files: usize,
    pub total_bytes: u64,
    /// Files written within the last hour
    pub recent: usize,
    pub by_prefix: BTreeMap<String, usize>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Cached content if the entry exists and is younger than `ttl`
    pub async fn get(&self, key: &CacheKey, ttl: Duration) -> Option<Bytes> {
        self.get_at(key, ttl, SystemTime::now()).await
    }

    /// [`FileCache::get`] against an explicit clock reading
    pub async fn get_at(&self, key: &CacheKey, ttl: Duration, now: SystemTime) -> Option<Bytes> {
        let path = self.path_for(key);
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        let modified = metadata.modified().ok()?;

        // A modification time ahead of `now` counts as brand new.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age >= ttl {
            debug!(key = %key, age_secs = age.as_secs(), ttl_secs = ttl.as_secs(), "Cache entry expired");
            return None;
        }

        match tokio::fs::read(&path).await {
            Ok(content) => Some(Bytes::from(content)),
            Err(e) => {
                debug!(key = %key, error = %e, "Cache entry unreadable");
                None
            }
        }
    }

    /// Write `content` for `key`, replacing any previous entry
    pub async fn put(&self, key: &CacheKey, content: &[u8]) -> KubiyaResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            KubiyaError::cache(format!(
                "Failed to create cache directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.path_for(key);
        tokio::fs::write(&path, content).await.map_err(|e| {
            KubiyaError::cache(format!("Failed to write cache file {}: {}", path.display(), e))
        })?;

        debug!(key = %key, bytes = content.len(), "Cached response");
        Ok(path)
    }

    /// Delete entries older than `max_age`; returns how many were removed
    pub async fn invalidate_older_than(&self, max_age: Duration) -> KubiyaResult<usize> {
        self.invalidate_older_than_at(max_age, SystemTime::now()).await
    }

    pub async fn invalidate_older_than_at(
        &self,
        max_age: Duration,
        now: SystemTime,
    ) -> KubiyaResult<usize> {
        let mut removed = 0;
        for (path, info) in self.entries().await? {
            let age = now.duration_since(info.modified).unwrap_or(Duration::ZERO);
            if age > max_age {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache file"),
                }
            }
        }
        debug!(dir = %self.dir.display(), removed, "Invalidated stale cache entries");
        Ok(removed)
    }

    /// Delete every entry
    pub async fn clear(&self) -> KubiyaResult<usize> {
        let mut removed = 0;
        for (path, _) in self.entries().await? {
            tokio::fs::remove_file(&path).await.map_err(|e| {
                KubiyaError::cache(format!("Failed to remove {}: {}", path.display(), e))
            })?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Entries sorted by file name
    pub async fn list(&self) -> KubiyaResult<Vec<CacheFileInfo>> {
        let mut files: Vec<CacheFileInfo> =
            self.entries().await?.into_iter().map(|(_, info)| info).collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub async fn stats(&self) -> KubiyaResult<CacheStats> {
        let now = SystemTime::now();
        let mut stats = CacheStats::default();

        for (_, info) in self.entries().await? {
            stats.files += 1;
            stats.total_bytes += info.size;
            if now.duration_since(info.modified).unwrap_or(Duration::ZERO) < RECENT_WINDOW {
                stats.recent += 1;
            }
            let prefix = info
                .name
                .trim_end_matches(".json")
                .rsplit_once('_')
                .map(|(p, _)| p.to_string())
                .unwrap_or_else(|| info.name.clone());
            *stats.by_prefix.entry(prefix).or_default() += 1;
        }

        Ok(stats)
    }

    async fn entries(&self) -> KubiyaResult<Vec<(PathBuf, CacheFileInfo)>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(KubiyaError::cache(format!(
                    "Failed to read cache directory {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let info = CacheFileInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                size: metadata.len(),
                modified: metadata.modified()?,
            };
            entries.push((path, info));
        }
        Ok(entries)
    }
}

mod system_time_secs {
    use serde::Serializer;
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        serializer.serialize_u64(secs)
    }
}
