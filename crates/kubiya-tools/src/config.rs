//! Tool runtime configuration
//!
//! Loaded from an optional YAML file; every field has a default so an empty
//! file (or no file) is valid.
//!
//! ```yaml
//! workspace_dir: /workspace
//! http_timeout_secs: 30
//! script_timeout_secs: 300
//! verify_tls: true
//! ```

use kubiya_core::{KubiyaError, KubiyaResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::cache::FileCache;

/// Overrides `workspace_dir`
pub const WORKSPACE_ENV: &str = "KUBIYA_WORKSPACE";

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("/workspace")
}

fn default_http_timeout() -> u64 {
    30
}

fn default_script_timeout() -> u64 {
    300
}

fn default_verify_tls() -> bool {
    true
}

/// Shared settings handed to every tool collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Root for per-tool data (`<workspace>/<tool>-data/cache`)
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,

    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            http_timeout_secs: default_http_timeout(),
            script_timeout_secs: default_script_timeout(),
            verify_tls: default_verify_tls(),
        }
    }
}

impl ToolsConfig {
    /// Parse YAML content
    pub fn from_yaml(content: &str) -> KubiyaResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| KubiyaError::config(format!("Failed to parse tools config: {}", e)))
    }

    /// Read a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> KubiyaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KubiyaError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded tools config");
        Self::from_yaml(&content)
    }

    /// Optional file, then the `KUBIYA_WORKSPACE` override
    pub fn load(path: Option<&Path>) -> KubiyaResult<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(WORKSPACE_ENV) {
            if !dir.trim().is_empty() {
                self.workspace_dir = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn with_workspace(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace_dir = dir.into();
        self
    }

    /// `<workspace>/<tool>-data`
    pub fn tool_data_dir(&self, tool: &str) -> PathBuf {
        self.workspace_dir.join(format!("{}-data", tool))
    }

    /// `<workspace>/<tool>-data/cache`
    pub fn cache_dir(&self, tool: &str) -> PathBuf {
        self.tool_data_dir(tool).join("cache")
    }

    pub fn cache_for(&self, tool: &str) -> FileCache {
        FileCache::new(self.cache_dir(tool))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolsConfig::default();
        assert_eq!(config.workspace_dir, PathBuf::from("/workspace"));
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.script_timeout_secs, 300);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_partial_yaml() {
        let config = ToolsConfig::from_yaml("workspace_dir: /tmp/ws\nverify_tls: false\n").unwrap();
        assert_eq!(config.workspace_dir, PathBuf::from("/tmp/ws"));
        assert!(!config.verify_tls);
        assert_eq!(config.http_timeout_secs, 30);

        assert_eq!(ToolsConfig::from_yaml("").unwrap(), ToolsConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = ToolsConfig::from_yaml("http_timeout_secs: soon").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_cache_layout() {
        let config = ToolsConfig::default().with_workspace("/data");
        assert_eq!(config.cache_dir("argocd"), PathBuf::from("/data/argocd-data/cache"));
        assert_eq!(config.cache_for("observe").dir(), Path::new("/data/observe-data/cache"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.yaml");
        std::fs::write(&path, "script_timeout_secs: 60\n").unwrap();
        let config = ToolsConfig::from_file(&path).unwrap();
        assert_eq!(config.script_timeout_secs, 60);

        assert!(ToolsConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
