//! Cache key derivation

use chrono::{DateTime, Utc};
use std::fmt;

/// Coarse time window folded into a cache key.
///
/// Two requests in the same bucket share a key; crossing a bucket boundary
/// forces a new entry even if the TTL has not elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBucket {
    /// `%Y%m%d%H`
    Hour,
    /// `%Y%m%d%H%M`
    Minute,
    /// `%Y%m%d`
    Day,
    /// Caller-supplied bucket string
    Fixed(String),
}

impl TimeBucket {
    /// Render the bucket for the given instant (UTC)
    pub fn format(&self, at: DateTime<Utc>) -> String {
        match self {
            TimeBucket::Hour => at.format("%Y%m%d%H").to_string(),
            TimeBucket::Minute => at.format("%Y%m%d%H%M").to_string(),
            TimeBucket::Day => at.format("%Y%m%d").to_string(),
            TimeBucket::Fixed(s) => s.clone(),
        }
    }

    pub fn current(&self) -> String {
        self.format(Utc::now())
    }

    /// Parse `hour`, `minute`, `day`, or treat anything else as a fixed bucket
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "hour" | "h" => TimeBucket::Hour,
            "minute" | "min" | "m" => TimeBucket::Minute,
            "day" | "d" => TimeBucket::Day,
            _ => TimeBucket::Fixed(s.to_string()),
        }
    }
}

/// Identifier of a cached response: `<prefix>_<digest>.json` on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: String,
    digest: String,
}

impl CacheKey {
    /// Use an existing digest under a different prefix.
    ///
    /// Lets related resources (an application and its resource tree) share
    /// one derived digest.
    pub fn with_prefix(&self, prefix: &str) -> CacheKey {
        CacheKey {
            prefix: sanitize(prefix),
            digest: self.digest.clone(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 32 lowercase hex characters
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.prefix, self.digest)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix, self.digest)
    }
}

/// Derive a deterministic key from an operation, its ordered parameters, and
/// a time bucket.
///
/// The pre-hash string is `"<operation>_<p1>_..._<pN>_<bucket>\n"`, the
/// same bytes `echo "<material>" | md5sum` hashes, so file names line up with
/// caches written by the shell plugins. Empty parameters keep their slot, so
/// "no filter" always maps to the same key.
pub fn derive_key<S: AsRef<str>>(operation: &str, params: &[S], bucket: &str) -> CacheKey {
    let mut material = String::from(operation);
    for param in params {
        material.push('_');
        material.push_str(param.as_ref());
    }
    material.push('_');
    material.push_str(bucket);
    material.push('\n');

    CacheKey {
        prefix: sanitize(operation),
        digest: format!("{:x}", md5::compute(material.as_bytes())),
    }
}

// Operation names end up in file names.
fn sanitize(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "entry".to_string()
    } else {
        cleaned
    }
}
