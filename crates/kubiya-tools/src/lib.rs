//! Kubiya Tools - Vendor tool plugins for Kubiya agents
//!
//! This crate provides the tool plugins an agent can call, a file-based TTL
//! cache for vendor responses, and a registry that groups tools by plugin.
//! Plugins can be enabled/disabled via feature flags.
//!
//! # Native tools
//!
//! Talk to vendor REST APIs in-process and cache list responses under the
//! workspace directory:
//!
//! ```yaml
//! tools:
//!   - argocd_list_applications   # ArgoCD applications, clusters, repos, sync, history
//!   - observe_api_command        # Observe datasets, monitors, queries
//!   - confluence_search          # Confluence CQL search
//! ```
//!
//! # Script tools
//!
//! Wrap a vendor CLI. Each carries the shell payload and container image an
//! external runner needs, and can also run locally:
//!
//! ```yaml
//! tools:
//!   - azure_cli           # Run any az command
//!   - bicep_template      # Build a Bicep template into ARM JSON
//!   - datadog_cli_command # Run any datadog command
//!   - github_cli          # Run any gh command
//!   - helm_cli_command    # Run any helm command in-cluster
//! ```
//!
//! # Feature Flags
//!
//! - `argocd`, `observe`, `confluence` - native plugins
//! - `azure`, `bicep`, `datadog`, `github`, `helm` - script plugins
//! - `all` - Enable all plugins (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use kubiya_tools::prelude::*;
//!
//! let config = ToolsConfig::load(None)?;
//! let executor = ToolRegistry::with_all_defaults(&config).into_executor();
//!
//! let result = executor
//!     .execute_tool("argocd_list_applications", ToolInput::new().with_arg("limit", "10"))
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod http;
pub mod output;
pub mod poll;
pub mod registry;
pub mod tools;

pub use cache::{CacheKey, CacheRequest, Cached, FileCache, TimeBucket};
pub use config::ToolsConfig;
pub use registry::{BuiltinToolExecutor, ToolGroup, ToolRegistry};
pub use tools::script::ScriptTool;

// ============================================================================
// Native Tools
// ============================================================================

#[cfg(feature = "argocd")]
pub use tools::argocd::{
    ArgoCDApplicationHistoryTool, ArgoCDGetApplicationTool, ArgoCDListApplicationsTool,
    ArgoCDListClustersTool, ArgoCDListRepositoriesTool, ArgoCDSyncApplicationTool, ArgoCDTools,
    ArgoCDWorkspaceManagerTool,
};

#[cfg(feature = "observe")]
pub use tools::observe::{ObserveApiCommandTool, ObserveTools};

#[cfg(feature = "confluence")]
pub use tools::confluence::{ConfluenceSearchTool, ConfluenceTools};

// ============================================================================
// Script Tools
// ============================================================================

#[cfg(feature = "azure")]
pub use tools::azure::AzureTools;

#[cfg(feature = "bicep")]
pub use tools::bicep::BicepTools;

#[cfg(feature = "datadog")]
pub use tools::datadog::DatadogTools;

#[cfg(feature = "github")]
pub use tools::github::GitHubTools;

#[cfg(feature = "helm")]
pub use tools::helm::HelmTools;

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::config::ToolsConfig;
    pub use super::registry::{BuiltinToolExecutor, ToolGroup, ToolRegistry};
    pub use kubiya_core::{Tool, ToolDefinition, ToolExecutor, ToolInput, ToolResult, ToolSpec};

    #[cfg(feature = "argocd")]
    pub use super::tools::argocd::ArgoCDTools;

    #[cfg(feature = "observe")]
    pub use super::tools::observe::ObserveTools;

    #[cfg(feature = "confluence")]
    pub use super::tools::confluence::ConfluenceTools;
}
