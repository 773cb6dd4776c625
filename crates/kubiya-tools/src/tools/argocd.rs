//! ArgoCD Tools
//!
//! Tools for ArgoCD's REST API with a response cache on the shared workspace
//! volume (`<workspace>/argocd-data/cache`).
//!
//! ## Available Tools
//!
//! - `argocd_list_applications` - List applications with filters and pagination
//! - `argocd_get_application` - Application detail and resource tree
//! - `argocd_list_clusters` - Registered clusters and connection state
//! - `argocd_list_repositories` - Registered repositories
//! - `argocd_sync_application` - Trigger a sync and wait for it to finish
//! - `argocd_application_history` - Deployment history and rollback
//! - `argocd_workspace_manager` - Inspect and clean the response cache
//!
//! ## Authentication
//!
//! All API tools use a bearer token from `ARGOCD_TOKEN` against
//! `ARGOCD_SERVER` (host name, or a full URL).
//!
//! ## Caching
//!
//! | Operation | Key parameters | Bucket | TTL |
//! |-----------|----------------|--------|-----|
//! | `apps` | limit, offset, project, health, sync | hour | 15 min |
//! | `app` / `resources` | app name | minute | 10 min |
//! | `clusters` | none | hour | 30 min |
//! | `repos` | repo type | hour | 30 min |
//!
//! Filtering and pagination run on the cached response. `refresh=true`
//! bypasses the lookup and overwrites the entry.

use async_trait::async_trait;
use bytes::Bytes;
use kubiya_core::{
    Arg, KubiyaError, KubiyaResult, Tool, ToolInput, ToolResult, ToolSpec, ToolType, DEFAULT_IMAGE,
};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::cache::{fetch_or_cache, fetch_or_cache_with_key, CacheRequest, Cached, FileCache, TimeBucket};
use crate::config::ToolsConfig;
use crate::http::{send, ApiClient, Auth, HttpResponse};
use crate::output::{breakdown, pretty_json, render_table, str_or, OutputFormat};
use crate::poll::{poll_until, PollConfig, PollOutcome, Probe, SyncPhase};

const ARGOCD_ICON_URL: &str = "https://argo-cd.readthedocs.io/en/stable/assets/logo.png";

/// Workspace directory name (`<workspace>/argocd-data`)
pub const WORKSPACE_TOOL: &str = "argocd";

const APPS_TTL: Duration = Duration::from_secs(15 * 60);
const APP_TTL: Duration = Duration::from_secs(10 * 60);
const CLUSTERS_TTL: Duration = Duration::from_secs(30 * 60);
const REPOS_TTL: Duration = Duration::from_secs(30 * 60);

/// Resources listed in the detailed view before summarising the rest
const MAX_LISTED_RESOURCES: usize = 20;

/// Collection of all ArgoCD tools
pub struct ArgoCDTools;

impl ArgoCDTools {
    /// Get all ArgoCD tools
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![
            Box::new(ArgoCDListApplicationsTool::new(config)),
            Box::new(ArgoCDGetApplicationTool::new(config)),
            Box::new(ArgoCDListClustersTool::new(config)),
            Box::new(ArgoCDListRepositoriesTool::new(config)),
            Box::new(ArgoCDSyncApplicationTool::new(config)),
            Box::new(ArgoCDApplicationHistoryTool::new(config)),
            Box::new(ArgoCDWorkspaceManagerTool::new(config)),
        ]
    }
}

fn argocd_spec(name: &str, description: &str, args: Vec<Arg>) -> ToolSpec {
    ToolSpec::new(name, description, DEFAULT_IMAGE)
        .with_args(args)
        .with_secrets(&["ARGOCD_TOKEN"])
        .with_env(&["ARGOCD_SERVER"])
        .with_icon(ARGOCD_ICON_URL)
        .with_type(ToolType::Native)
}

fn refresh_arg() -> Arg {
    Arg::optional("refresh", "Force refresh cache: true/false (default: false)").with_default("false")
}

/// Create ArgoCD HTTP client from `ARGOCD_SERVER` / `ARGOCD_TOKEN`
fn create_argocd_client(input: &ToolInput, config: &ToolsConfig) -> KubiyaResult<ApiClient> {
    let token = input.require_env(
        "ARGOCD_TOKEN",
        "Generate a token with: argocd account generate-token",
    )?;
    let server = input.require_env(
        "ARGOCD_SERVER",
        "Set it to the ArgoCD server host, e.g. argocd.example.com",
    )?;
    ApiClient::new(&server, Auth::Bearer(token), config.http_timeout(), config.verify_tls)
}

/// Kubernetes resource name; keeps `app_name` a single URL path segment
const APP_NAME_PATTERN: &str = r"^[a-z0-9]([-a-z0-9.]*[a-z0-9])?$";
const APP_NAME_MAX_LEN: usize = 253;

/// Read `app_name` and reject anything that is not a valid application name
fn app_name_arg(input: &ToolInput) -> KubiyaResult<String> {
    let app = input.get_arg("app_name")?;
    let matches = Regex::new(APP_NAME_PATTERN)
        .map(|re| re.is_match(&app))
        .map_err(|e| KubiyaError::tool(e.to_string()))?;
    if !matches || app.len() > APP_NAME_MAX_LEN {
        return Err(KubiyaError::invalid_argument(format!(
            "Invalid application name '{}': use lowercase letters, digits, '-' and '.'",
            app
        )));
    }
    Ok(app)
}

/// Map an ArgoCD error response to an HTTP error with guidance
fn handle_argocd_error(response: &HttpResponse) -> KubiyaError {
    let message = response
        .error_message()
        .unwrap_or_else(|| "Unknown error".to_string());

    let hint = match response.status {
        401 => "Authentication failed. Token may be invalid or expired. \
                Generate a new token using: argocd account generate-token"
            .to_string(),
        403 => format!(
            "Authorization failed: {}. Check that the token has appropriate project permissions.",
            message
        ),
        404 => format!(
            "Resource not found. Verify the application name and project. Details: {}",
            message
        ),
        409 => "Another operation is in progress for this application. \
                Wait for the current operation to complete and retry."
            .to_string(),
        429 => "Rate limited. Retry after cooldown period.".to_string(),
        500..=599 => format!("ArgoCD server error: {}", message),
        status => format!("ArgoCD returned status {}: {}", status, message),
    };
    KubiyaError::http(response.status, hint)
}

/// GET a path and return the raw body, failing on non-2xx
async fn get_bytes(client: &ApiClient, path: &str, query: &[(&str, String)]) -> KubiyaResult<Bytes> {
    let response = send(client.get(path).query(query)).await?;
    if !response.is_success() {
        return Err(handle_argocd_error(&response));
    }
    Ok(response.body)
}

fn parse_json(data: &[u8]) -> KubiyaResult<Value> {
    serde_json::from_slice(data)
        .map_err(|e| KubiyaError::parse(format!("Unexpected response format: {}", e)))
}

/// `.items` as a list; ArgoCD sends `null` for empty lists
fn items(body: &Value) -> Vec<Value> {
    body.get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn cache_notice(cached: &Cached, what: &str) -> Option<String> {
    if cached.from_cache() {
        Some(format!("Using cached {} from: {}", what, cached.key.file_name()))
    } else {
        cached
            .path
            .as_ref()
            .map(|_| format!("Cached {} to workspace: argocd-data/cache/{}", what, cached.key.file_name()))
    }
}

/// Prefix status lines unless the caller asked for machine-readable output
fn with_notices(format: OutputFormat, notices: Vec<String>, body: String) -> String {
    if format == OutputFormat::Json || notices.is_empty() {
        body
    } else {
        format!("{}\n\n{}", notices.join("\n"), body)
    }
}

fn app_name(app: &Value) -> String {
    str_or(app, &["/metadata/name"], "unknown")
}

fn app_cluster(app: &Value) -> String {
    str_or(app, &["/spec/destination/server", "/spec/destination/name"], "unknown")
}

fn app_namespace(app: &Value) -> String {
    str_or(app, &["/spec/destination/namespace"], "default")
}

fn app_health(app: &Value) -> String {
    str_or(app, &["/status/health/status"], "unknown")
}

fn app_sync(app: &Value) -> String {
    str_or(app, &["/status/sync/status"], "unknown")
}

// ============================================================================
// ArgoCD List Applications Tool
// ============================================================================

/// List ArgoCD applications with filtering and pagination
pub struct ArgoCDListApplicationsTool {
    spec: ToolSpec,
    config: ToolsConfig,
    cache: FileCache,
}

impl ArgoCDListApplicationsTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = argocd_spec(
            "argocd_list_applications",
            "List ArgoCD applications with filtering, search, pagination, and multiple output formats. \
             Supports project filtering, health status filtering, and sync status filtering.",
            vec![
                Arg::optional("limit", "Maximum number of applications to return (default: 50)").with_default("50"),
                Arg::optional("offset", "Number of applications to skip for pagination (default: 0)").with_default("0"),
                Arg::optional("project_filter", "Filter by project name"),
                Arg::optional(
                    "health_filter",
                    "Filter by health status: Healthy, Progressing, Degraded, Suspended, Missing, Unknown",
                ),
                Arg::optional("sync_filter", "Filter by sync status: Synced, OutOfSync, Unknown"),
                Arg::optional("output_format", "Output format: table, json, compact, summary (default: table)")
                    .with_default("table"),
                refresh_arg(),
            ],
        );

        Self {
            spec,
            config: config.clone(),
            cache: config.cache_for(WORKSPACE_TOOL),
        }
    }
}

#[async_trait]
impl Tool for ArgoCDListApplicationsTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        let client = create_argocd_client(&input, &self.config)?;
        let limit: usize = input.parse_arg("limit", 50)?;
        let offset: usize = input.parse_arg("offset", 0)?;
        let project = input.opt_arg("project_filter");
        let health = input.opt_arg("health_filter");
        let sync = input.opt_arg("sync_filter");
        let format = OutputFormat::from_input(&input, OutputFormat::Table);

        debug!(limit, offset, project = ?project, "Listing ArgoCD applications");

        let request = CacheRequest::new("apps", APPS_TTL, TimeBucket::Hour)
            .param(Some(limit.to_string()))
            .param(Some(offset.to_string()))
            .param(project.as_deref())
            .param(health.as_deref())
            .param(sync.as_deref())
            .force_refresh(input.flag("refresh", false));

        let query: Vec<(&str, String)> = project.iter().map(|p| ("projects", p.clone())).collect();
        let cached = match fetch_or_cache(&self.cache, &request, || {
            get_bytes(&client, "/api/v1/applications", &query)
        })
        .await
        {
            Ok(cached) => cached,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };

        let body = match parse_json(&cached.data) {
            Ok(body) => body,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };

        let filtered: Vec<Value> = items(&body)
            .into_iter()
            .filter(|app| health.as_deref().map_or(true, |h| app_health(app) == h))
            .filter(|app| sync.as_deref().map_or(true, |s| app_sync(app) == s))
            .collect();
        let total = filtered.len();
        let page: Vec<Value> = filtered.into_iter().skip(offset).take(limit).collect();

        let rendered = match format {
            OutputFormat::Table => {
                if page.is_empty() {
                    "No applications found".to_string()
                } else {
                    render_table(
                        &["NAME", "PROJECT", "CLUSTER", "NAMESPACE", "HEALTH", "SYNC", "SOURCE"],
                        page.iter()
                            .map(|app| {
                                vec![
                                    app_name(app),
                                    str_or(app, &["/spec/project"], "default"),
                                    app_cluster(app),
                                    app_namespace(app),
                                    app_health(app),
                                    app_sync(app),
                                    str_or(app, &["/spec/source/repoURL"], "unknown"),
                                ]
                            })
                            .collect(),
                    )
                }
            }
            OutputFormat::Compact => page
                .iter()
                .map(|app| {
                    format!(
                        "{}: {}/{} in {}",
                        app_name(app),
                        app_health(app),
                        app_sync(app),
                        app_namespace(app)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Summary => format!(
                "Total applications: {}\n{}\n{}",
                page.len(),
                breakdown("Health status breakdown", page.iter().map(app_health)),
                breakdown("Sync status breakdown", page.iter().map(app_sync)),
            ),
            _ => pretty_json(&Value::Array(page.clone())),
        };

        let mut notices: Vec<String> = cache_notice(&cached, "applications list").into_iter().collect();
        notices.push(format!("Found {} applications", total));

        Ok(ToolResult::text(with_notices(format, notices, rendered)).with_data(json!({
            "applications": page,
            "total": total,
            "limit": limit,
            "offset": offset,
            "cached": cached.from_cache(),
        })))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}

// ============================================================================
// ArgoCD Get Application Tool
// ============================================================================

/// Get detailed information about a single application
pub struct ArgoCDGetApplicationTool {
    spec: ToolSpec,
    config: ToolsConfig,
    cache: FileCache,
}

impl ArgoCDGetApplicationTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = argocd_spec(
            "argocd_get_application",
            "Get detailed information about a specific ArgoCD application including resources, \
             health and sync status. Supports caching and multiple output formats.",
            vec![
                Arg::required("app_name", "Name of the ArgoCD application"),
                Arg::optional("output_format", "Output format: basic, detailed, json, resources (default: detailed)")
                    .with_default("detailed"),
                Arg::optional(
                    "include_resources",
                    "Include resource tree information: true/false (default: true)",
                )
                .with_default("true"),
                refresh_arg(),
            ],
        );

        Self {
            spec,
            config: config.clone(),
            cache: config.cache_for(WORKSPACE_TOOL),
        }
    }
}

fn resource_health(node: &Value) -> String {
    str_or(node, &["/health/status", "/health"], "unknown")
}

fn nodes(tree: &Value) -> Vec<Value> {
    tree.get("nodes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn render_application_detailed(app: &Value, tree: Option<&Value>) -> String {
    let mut lines = vec![
        "Application Details:".to_string(),
        "====================".to_string(),
        format!("Name: {}", app_name(app)),
        format!("Project: {}", str_or(app, &["/spec/project"], "default")),
        format!("Created: {}", str_or(app, &["/metadata/creationTimestamp"], "unknown")),
        String::new(),
        "Destination:".to_string(),
        format!("  Cluster: {}", app_cluster(app)),
        format!("  Namespace: {}", app_namespace(app)),
        String::new(),
        "Source:".to_string(),
        format!("  Repository: {}", str_or(app, &["/spec/source/repoURL"], "unknown")),
        format!("  Path: {}", str_or(app, &["/spec/source/path"], ".")),
        format!("  Branch/Tag: {}", str_or(app, &["/spec/source/targetRevision"], "HEAD")),
        String::new(),
        format!("Health Status: {}", app_health(app)),
        format!("Sync Status: {}", app_sync(app)),
    ];

    if let Some(tree) = tree {
        let nodes = nodes(tree);
        lines.push(String::new());
        lines.push("Resources:".to_string());
        for node in nodes.iter().take(MAX_LISTED_RESOURCES) {
            lines.push(format!(
                "  - {}/{} - {}",
                str_or(node, &["/kind"], "Unknown"),
                str_or(node, &["/name"], "unknown"),
                resource_health(node)
            ));
        }
        if nodes.len() > MAX_LISTED_RESOURCES {
            lines.push(format!(
                "  ... and {} more resources",
                nodes.len() - MAX_LISTED_RESOURCES
            ));
        }
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for ArgoCDGetApplicationTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        self.spec.validate_args(&input)?;
        let client = create_argocd_client(&input, &self.config)?;
        let app = app_name_arg(&input)?;
        let format = OutputFormat::from_input(&input, OutputFormat::Detailed);
        let include_resources = input.flag("include_resources", true);
        let refresh = input.flag("refresh", false);

        debug!(app_name = %app, "Getting ArgoCD application");

        let request = CacheRequest::new("app", APP_TTL, TimeBucket::Minute).param(Some(&app));
        let app_key = request.key();
        let resources_key = app_key.with_prefix("resources");

        let app_path = format!("/api/v1/applications/{}", app);
        let cached = match fetch_or_cache_with_key(&self.cache, app_key, APP_TTL, refresh, || {
            get_bytes(&client, &app_path, &[])
        })
        .await
        {
            Ok(cached) => cached,
            Err(e) => {
                return Ok(ToolResult::failure(
                    format!("Failed to fetch application {}: {}", app, e),
                    e.exit_code(),
                ))
            }
        };
        let app_data = match parse_json(&cached.data) {
            Ok(v) => v,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };

        // The resource tree is optional; its failure never fails the call.
        let tree = if include_resources {
            let tree_path = format!("/api/v1/applications/{}/resource-tree", app);
            match fetch_or_cache_with_key(&self.cache, resources_key, APP_TTL, refresh, || {
                get_bytes(&client, &tree_path, &[])
            })
            .await
            {
                Ok(c) => parse_json(&c.data).ok(),
                Err(e) => {
                    warn!(app_name = %app, error = %e, "Resource tree unavailable");
                    None
                }
            }
        } else {
            None
        };

        let rendered = match format {
            OutputFormat::Basic => [
                format!("Application: {}", app_name(&app_data)),
                format!("Project: {}", str_or(&app_data, &["/spec/project"], "default")),
                format!("Cluster: {}", app_cluster(&app_data)),
                format!("Namespace: {}", app_namespace(&app_data)),
                format!("Health: {}", app_health(&app_data)),
                format!("Sync: {}", app_sync(&app_data)),
                format!("Source: {}", str_or(&app_data, &["/spec/source/repoURL"], "unknown")),
                format!("Path: {}", str_or(&app_data, &["/spec/source/path"], ".")),
            ]
            .join("\n"),
            OutputFormat::Detailed => render_application_detailed(&app_data, tree.as_ref()),
            OutputFormat::Resources => match &tree {
                Some(tree) => {
                    let mut lines = vec![
                        "Application Resources:".to_string(),
                        "======================".to_string(),
                    ];
                    lines.extend(nodes(tree).iter().map(|node| {
                        format!(
                            "{}/{} - Health: {}, Sync: {}",
                            str_or(node, &["/kind"], "Unknown"),
                            str_or(node, &["/name"], "unknown"),
                            resource_health(node),
                            str_or(node, &["/status"], "unknown")
                        )
                    }));
                    lines.join("\n")
                }
                None => "No resource data available".to_string(),
            },
            _ => match &tree {
                Some(tree) => pretty_json(&json!({"application": app_data, "resources": tree})),
                None => pretty_json(&app_data),
            },
        };

        let notices = cache_notice(&cached, "application data").into_iter().collect();
        Ok(ToolResult::text(with_notices(format, notices, rendered)).with_data(json!({
            "application": app_data,
            "resources": tree,
            "cached": cached.from_cache(),
        })))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}

// ============================================================================
// ArgoCD List Clusters Tool
// ============================================================================

/// List registered clusters
pub struct ArgoCDListClustersTool {
    spec: ToolSpec,
    config: ToolsConfig,
    cache: FileCache,
}

impl ArgoCDListClustersTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = argocd_spec(
            "argocd_list_clusters",
            "List all ArgoCD clusters with health status and connection info. \
             Supports caching and multiple output formats.",
            vec![
                Arg::optional("output_format", "Output format: table, json, summary (default: table)")
                    .with_default("table"),
                refresh_arg(),
            ],
        );

        Self {
            spec,
            config: config.clone(),
            cache: config.cache_for(WORKSPACE_TOOL),
        }
    }
}

fn connection_status(item: &Value) -> String {
    str_or(
        item,
        &["/connectionState/status", "/info/connectionState/status"],
        "unknown",
    )
}

#[async_trait]
impl Tool for ArgoCDListClustersTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        let client = create_argocd_client(&input, &self.config)?;
        let format = OutputFormat::from_input(&input, OutputFormat::Table);

        let request = CacheRequest::new("clusters", CLUSTERS_TTL, TimeBucket::Hour)
            .force_refresh(input.flag("refresh", false));

        let cached = match fetch_or_cache(&self.cache, &request, || {
            get_bytes(&client, "/api/v1/clusters", &[])
        })
        .await
        {
            Ok(cached) => cached,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };
        let body = match parse_json(&cached.data) {
            Ok(v) => v,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };
        let clusters = items(&body);

        let rendered = match format {
            OutputFormat::Table if clusters.is_empty() => "No clusters found".to_string(),
            OutputFormat::Table => render_table(
                &["NAME", "SERVER", "VERSION", "STATUS", "MESSAGE"],
                clusters
                    .iter()
                    .map(|c| {
                        vec![
                            str_or(c, &["/name"], "in-cluster"),
                            str_or(c, &["/server"], ""),
                            str_or(c, &["/serverVersion", "/info/serverVersion"], "unknown"),
                            connection_status(c),
                            str_or(
                                c,
                                &["/connectionState/message", "/info/connectionState/message"],
                                "",
                            ),
                        ]
                    })
                    .collect(),
            ),
            OutputFormat::Summary => format!(
                "Total clusters: {}\n{}",
                clusters.len(),
                breakdown("Connection status", clusters.iter().map(connection_status))
            ),
            _ => pretty_json(&body),
        };

        let notices = cache_notice(&cached, "clusters list").into_iter().collect();
        Ok(ToolResult::text(with_notices(format, notices, rendered))
            .with_data(json!({"clusters": clusters, "cached": cached.from_cache()})))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}

// ============================================================================
// ArgoCD List Repositories Tool
// ============================================================================

/// List registered repositories
pub struct ArgoCDListRepositoriesTool {
    spec: ToolSpec,
    config: ToolsConfig,
    cache: FileCache,
}

impl ArgoCDListRepositoriesTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = argocd_spec(
            "argocd_list_repositories",
            "List all ArgoCD repositories with connection status and filtering. \
             Supports caching and multiple output formats.",
            vec![
                Arg::optional("repo_type", "Filter by repository type: git, helm, all (default: all)")
                    .with_default("all"),
                Arg::optional("output_format", "Output format: table, json, summary (default: table)")
                    .with_default("table"),
                refresh_arg(),
            ],
        );

        Self {
            spec,
            config: config.clone(),
            cache: config.cache_for(WORKSPACE_TOOL),
        }
    }
}

fn repo_type(repo: &Value) -> String {
    str_or(repo, &["/type"], "git")
}

#[async_trait]
impl Tool for ArgoCDListRepositoriesTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        let client = create_argocd_client(&input, &self.config)?;
        let format = OutputFormat::from_input(&input, OutputFormat::Table);
        let wanted = input.arg_or("repo_type", "all").to_ascii_lowercase();
        if !matches!(wanted.as_str(), "git" | "helm" | "all") {
            return Err(KubiyaError::invalid_argument(format!(
                "Invalid repo_type '{}'. Use git, helm, or all.",
                wanted
            )));
        }

        let request = CacheRequest::new("repos", REPOS_TTL, TimeBucket::Hour)
            .param(Some(&wanted))
            .force_refresh(input.flag("refresh", false));

        let cached = match fetch_or_cache(&self.cache, &request, || {
            get_bytes(&client, "/api/v1/repositories", &[])
        })
        .await
        {
            Ok(cached) => cached,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };
        let body = match parse_json(&cached.data) {
            Ok(v) => v,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };

        let repos: Vec<Value> = items(&body)
            .into_iter()
            .filter(|r| wanted == "all" || repo_type(r) == wanted)
            .collect();

        let rendered = match format {
            OutputFormat::Table if repos.is_empty() => "No repositories found".to_string(),
            OutputFormat::Table => render_table(
                &["REPOSITORY", "TYPE", "STATUS", "PROJECT", "INSECURE"],
                repos
                    .iter()
                    .map(|r| {
                        vec![
                            str_or(r, &["/repo"], ""),
                            repo_type(r),
                            connection_status(r),
                            str_or(r, &["/project"], "default"),
                            r.get("insecure").and_then(Value::as_bool).unwrap_or(false).to_string(),
                        ]
                    })
                    .collect(),
            ),
            OutputFormat::Summary => format!(
                "Total repositories: {}\n{}\n{}",
                repos.len(),
                breakdown("Repository types", repos.iter().map(repo_type)),
                breakdown("Connection status", repos.iter().map(connection_status)),
            ),
            _ => pretty_json(&json!({ "items": repos })),
        };

        let notices = cache_notice(&cached, "repositories list").into_iter().collect();
        Ok(ToolResult::text(with_notices(format, notices, rendered))
            .with_data(json!({"repositories": repos, "cached": cached.from_cache()})))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}

// ============================================================================
// ArgoCD Sync Application Tool
// ============================================================================

/// Trigger a sync and optionally wait for the operation to finish
pub struct ArgoCDSyncApplicationTool {
    spec: ToolSpec,
    config: ToolsConfig,
    poll: PollConfig,
}

impl ArgoCDSyncApplicationTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = argocd_spec(
            "argocd_sync_application",
            "Sync an ArgoCD application with options for dry-run, prune, force, and resource targeting. \
             Monitors sync progress and provides detailed feedback.",
            vec![
                Arg::required("app_name", "Name of the ArgoCD application to sync"),
                Arg::optional("dry_run", "Perform a dry run without making changes: true/false (default: false)")
                    .with_default("false"),
                Arg::optional("prune", "Prune resources not defined in Git: true/false (default: false)")
                    .with_default("false"),
                Arg::optional("force", "Force sync even if application is out of sync: true/false (default: false)")
                    .with_default("false"),
                Arg::optional("resources", "Comma-separated list of specific resources to sync (format: Kind/Name)"),
                Arg::optional("wait", "Wait for sync completion: true/false (default: true)").with_default("true"),
            ],
        );

        Self {
            spec,
            config: config.clone(),
            poll: PollConfig::default(),
        }
    }

    /// Override attempts and interval of the completion wait
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

/// Parse `Kind/Name,Kind/Name` into sync resource selectors
fn parse_sync_resources(raw: &str) -> KubiyaResult<Vec<Value>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('/') {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() => Ok(json!({
                "group": "",
                "version": "v1",
                "kind": kind,
                "name": name,
            })),
            _ => Err(KubiyaError::invalid_argument(format!(
                "Invalid resource '{}'. Expected Kind/Name",
                entry
            ))),
        })
        .collect()
}

/// One observation of the running operation
#[derive(Debug, Clone)]
struct OperationStatus {
    phase: SyncPhase,
    message: String,
    result: Option<Value>,
}

async fn probe_operation(client: &ApiClient, path: &str) -> Probe<OperationStatus> {
    let response = match send(client.get(path)).await {
        Ok(r) if r.is_success() && !r.body.is_empty() => r,
        _ => return Probe::Gone,
    };
    let body: Value = match serde_json::from_slice(&response.body) {
        Ok(v) => v,
        Err(_) => return Probe::Gone,
    };
    let status = OperationStatus {
        phase: SyncPhase::parse(&str_or(
            &body,
            &["/operation/sync/phase", "/phase"],
            "unknown",
        )),
        message: str_or(&body, &["/operation/sync/message", "/message"], ""),
        result: body.pointer("/operation/sync/result").cloned(),
    };
    if status.phase.is_terminal() {
        Probe::Terminal(status)
    } else {
        Probe::Pending(status)
    }
}

#[async_trait]
impl Tool for ArgoCDSyncApplicationTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        self.spec.validate_args(&input)?;
        let client = create_argocd_client(&input, &self.config)?;
        let app = app_name_arg(&input)?;
        let dry_run = input.flag("dry_run", false);
        let prune = input.flag("prune", false);
        let force = input.flag("force", false);
        let wait = input.flag("wait", true);
        let resources = input.opt_arg("resources");

        let mut payload = json!({
            "dryRun": dry_run,
            "prune": prune,
            "force": force,
        });
        if let Some(raw) = &resources {
            payload["resources"] = Value::Array(parse_sync_resources(raw)?);
        }

        info!(app_name = %app, dry_run, prune, force, "Syncing ArgoCD application");

        let mut lines = vec![
            format!("Initiating sync for application: {}", app),
            "Sync options:".to_string(),
            format!("  Dry run: {}", dry_run),
            format!("  Prune: {}", prune),
            format!("  Force: {}", force),
        ];
        if let Some(r) = &resources {
            lines.push(format!("  Target resources: {}", r));
        }
        lines.push(String::new());

        let sync_path = format!("/api/v1/applications/{}/sync", app);
        let response = match send(client.post(&sync_path).json(&payload)).await {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };
        if !response.is_success() {
            let err = handle_argocd_error(&response);
            lines.push(format!("Sync request failed: {}", err));
            return Ok(ToolResult::failure(lines.join("\n"), 1));
        }

        let sync_response: Value = match response.json() {
            Ok(v) if v.get("metadata").is_some() => v,
            _ => {
                lines.push("Unexpected response format:".to_string());
                lines.push(response.text());
                return Ok(ToolResult::failure(lines.join("\n"), 1));
            }
        };

        lines.push("Sync initiated successfully".to_string());
        lines.push(format!(
            "Operation: {}",
            str_or(&sync_response, &["/metadata/name"], "unknown")
        ));

        if dry_run {
            lines.push(String::new());
            lines.push("Dry Run Results:".to_string());
            lines.push(str_or(&sync_response, &["/status/message"], "Sync would be performed"));
            return Ok(ToolResult::text(lines.join("\n"))
                .with_data(json!({"dry_run": true, "response": sync_response})));
        }

        let mut final_phase = None;
        if wait {
            lines.push(String::new());
            lines.push("Waiting for sync to complete...".to_string());

            let progress = Mutex::new(Vec::new());
            let operation_path = format!("/api/v1/applications/{}/operation", app);
            let (client_ref, path, log) = (&client, operation_path.as_str(), &progress);
            let outcome = poll_until(self.poll, move |_| async move {
                let probe = probe_operation(client_ref, path).await;
                if let Probe::Pending(status) | Probe::Terminal(status) = &probe {
                    if let Ok(mut log) = log.lock() {
                        log.push(format!("Status: {} - {}", status.phase, status.message));
                    }
                }
                probe
            })
            .await;
            lines.extend(progress.into_inner().unwrap_or_default());

            match outcome {
                PollOutcome::Terminal { value, .. } if value.phase.is_success() => {
                    lines.push("Sync completed successfully!".to_string());
                    final_phase = Some(value.phase.to_string());
                }
                PollOutcome::Terminal { value, .. } => {
                    lines.push(format!("Sync failed: {}", value.message));
                    lines.push(
                        value
                            .result
                            .as_ref()
                            .map(pretty_json)
                            .unwrap_or_else(|| "No detailed error available".to_string()),
                    );
                    return Ok(ToolResult::failure(lines.join("\n"), 1)
                        .with_data(json!({"phase": value.phase.to_string()})));
                }
                PollOutcome::Gone { .. } => {
                    lines.push("Sync completed (no active operation)".to_string());
                }
                PollOutcome::TimedOut { last, attempts } => {
                    let phase = last
                        .map(|s| s.phase.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    let err = KubiyaError::timeout(format!(
                        "Sync still running after {} checks ({}s); last phase: {}",
                        attempts,
                        self.poll.budget().as_secs(),
                        phase
                    ));
                    lines.push(err.to_string());
                    return Ok(ToolResult::failure(lines.join("\n"), err.exit_code())
                        .with_data(json!({"phase": phase, "timed_out": true})));
                }
            }
        }

        // Final application status is informational only.
        let app_path = format!("/api/v1/applications/{}", app);
        if let Ok(status) = get_bytes(&client, &app_path, &[]).await {
            if let Ok(app_data) = parse_json(&status) {
                lines.push(String::new());
                lines.push("Final Application Status:".to_string());
                lines.push(format!("  Health: {}", app_health(&app_data)));
                lines.push(format!("  Sync: {}", app_sync(&app_data)));
                lines.push(format!(
                    "  Last Sync: {}",
                    str_or(&app_data, &["/status/operationState/finishedAt"], "unknown")
                ));
            }
        }

        Ok(ToolResult::text(lines.join("\n")).with_data(json!({
            "operation": sync_response.pointer("/metadata/name"),
            "phase": final_phase,
        })))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}

// ============================================================================
// ArgoCD Application History Tool
// ============================================================================

/// Deployment history with rollback
pub struct ArgoCDApplicationHistoryTool {
    spec: ToolSpec,
    config: ToolsConfig,
}

impl ArgoCDApplicationHistoryTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = argocd_spec(
            "argocd_application_history",
            "Get ArgoCD application deployment history with revision information. \
             Supports rollback operations and history analysis.",
            vec![
                Arg::required("app_name", "Name of the ArgoCD application"),
                Arg::optional("action", "Action to perform: history, list, rollback (default: history)")
                    .with_default("history"),
                Arg::optional("limit", "Number of history entries to show (default: 10)").with_default("10"),
                Arg::optional("revision", "Revision or history ID to rollback to (required for rollback action)"),
                Arg::optional("output_format", "Output format: table, json, summary (default: table)")
                    .with_default("table"),
            ],
        );

        Self {
            spec,
            config: config.clone(),
        }
    }
}

fn history_id(entry: &Value) -> Option<i64> {
    entry.get("id").and_then(Value::as_i64)
}

fn history_date(entry: &Value) -> String {
    str_or(entry, &["/deployedAt", "/deployStartedAt"], "unknown")
}

fn history_initiator(entry: &Value) -> String {
    if entry.pointer("/initiatedBy/automated").and_then(Value::as_bool) == Some(true) {
        "automated".to_string()
    } else {
        str_or(entry, &["/initiatedBy/username"], "unknown")
    }
}

fn history_revision(entry: &Value) -> String {
    str_or(entry, &["/revision", "/revisions/0"], "unknown")
}

/// Match by history id, full revision, or revision prefix of 7+ characters
fn find_history_entry<'a>(history: &'a [Value], wanted: &str) -> Option<&'a Value> {
    history.iter().find(|entry| {
        history_id(entry).map(|id| id.to_string()) == Some(wanted.to_string())
            || history_revision(entry) == wanted
            || (wanted.len() >= 7 && history_revision(entry).starts_with(wanted))
    })
}

#[async_trait]
impl Tool for ArgoCDApplicationHistoryTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        self.spec.validate_args(&input)?;
        let client = create_argocd_client(&input, &self.config)?;
        let app = app_name_arg(&input)?;
        let action = input.arg_or("action", "history");
        let limit: usize = input.parse_arg("limit", 10)?;
        let format = OutputFormat::from_input(&input, OutputFormat::Table);

        if !matches!(action.as_str(), "history" | "list" | "rollback") {
            return Ok(ToolResult::error(format!(
                "Unknown action: {}\nAvailable actions: history, list, rollback",
                action
            )));
        }
        let revision = input.opt_arg("revision");
        if action == "rollback" && revision.is_none() {
            return Err(KubiyaError::invalid_argument(
                "Revision parameter required for rollback action",
            ));
        }

        let app_path = format!("/api/v1/applications/{}", app);
        let app_data = match get_bytes(&client, &app_path, &[]).await.and_then(|b| parse_json(&b)) {
            Ok(v) => v,
            Err(e) => {
                return Ok(ToolResult::failure(
                    format!("Failed to fetch application history: {}", e),
                    e.exit_code(),
                ))
            }
        };

        let mut history = app_data
            .pointer("/status/history")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        // Newest first
        history.reverse();

        if let Some(wanted) = revision.filter(|_| action == "rollback") {
            let entry = match find_history_entry(&history, &wanted) {
                Some(entry) => entry,
                None => {
                    return Ok(ToolResult::error(format!(
                        "Revision {} not found in the history of {}",
                        wanted, app
                    )))
                }
            };
            let Some(id) = history_id(entry) else {
                return Ok(ToolResult::error(format!(
                    "History entry for revision {} has no id",
                    wanted
                )));
            };

            info!(app_name = %app, id, "Rolling back ArgoCD application");
            let rollback_path = format!("/api/v1/applications/{}/rollback", app);
            let body = json!({"id": id, "dryRun": false, "prune": false});
            let response = match send(client.post(&rollback_path).json(&body)).await {
                Ok(r) => r,
                Err(e) => return Ok(ToolResult::from_error(&e)),
            };
            if !response.is_success() {
                let err = handle_argocd_error(&response);
                return Ok(ToolResult::failure(format!("Rollback failed: {}", err), 1));
            }
            let operation = response
                .json()
                .ok()
                .map(|v| str_or(&v, &["/metadata/name"], "unknown"))
                .unwrap_or_else(|| "unknown".to_string());

            return Ok(ToolResult::text(format!(
                "Rolling back to revision: {}\nRollback initiated to revision {} (history id {})\nOperation: {}",
                history_revision(entry),
                history_revision(entry),
                id,
                operation
            ))
            .with_data(json!({"id": id, "revision": history_revision(entry)})));
        }

        let shown: Vec<Value> = history.iter().take(limit).cloned().collect();
        let rendered = match format {
            OutputFormat::Table if shown.is_empty() => "No history found".to_string(),
            OutputFormat::Table => render_table(
                &["ID", "REVISION", "DEPLOYED AT", "INITIATED BY", "SOURCE"],
                shown
                    .iter()
                    .map(|e| {
                        vec![
                            history_id(e).map(|id| id.to_string()).unwrap_or_default(),
                            history_revision(e),
                            history_date(e),
                            history_initiator(e),
                            str_or(e, &["/source/repoURL"], ""),
                        ]
                    })
                    .collect(),
            ),
            OutputFormat::Summary if shown.is_empty() => "No history found".to_string(),
            OutputFormat::Summary => {
                let mut lines = vec![
                    format!("Total revisions: {}", history.len()),
                    format!("Showing last {} revisions:", shown.len()),
                ];
                lines.extend(shown.iter().map(|e| {
                    format!(
                        "  {} - {} by {}",
                        history_revision(e),
                        history_date(e),
                        history_initiator(e)
                    )
                }));
                lines.join("\n")
            }
            _ => pretty_json(&Value::Array(shown.clone())),
        };

        Ok(ToolResult::text(rendered).with_data(json!({
            "history": shown,
            "total": history.len(),
        })))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}

// ============================================================================
// ArgoCD Workspace Manager Tool
// ============================================================================

/// Cache inspection and maintenance
pub struct ArgoCDWorkspaceManagerTool {
    spec: ToolSpec,
    workspace: std::path::PathBuf,
    cache: FileCache,
}

const CLEANUP_AGE: Duration = Duration::from_secs(24 * 3600);
const RECENT_LISTING: Duration = Duration::from_secs(4 * 3600);

impl ArgoCDWorkspaceManagerTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = ToolSpec::new(
            "argocd_workspace_manager",
            "Manage ArgoCD workspace data including cache management, cleanup operations, \
             and storage monitoring.",
            DEFAULT_IMAGE,
        )
        .with_args(vec![Arg::optional(
            "action",
            "Action to perform: status, list-cache, cleanup, clear-cache, stats",
        )
        .with_default("status")])
        .with_icon(ARGOCD_ICON_URL)
        .with_type(ToolType::Native);

        Self {
            spec,
            workspace: config.tool_data_dir(WORKSPACE_TOOL),
            cache: config.cache_for(WORKSPACE_TOOL),
        }
    }
}

fn format_time(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

#[async_trait]
impl Tool for ArgoCDWorkspaceManagerTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        let action = input.arg_or("action", "status");
        let mut lines = vec![
            "ArgoCD Workspace Manager".to_string(),
            format!("Workspace: {}", self.workspace.display()),
            String::new(),
        ];

        match action.as_str() {
            "status" | "info" => {
                let stats = self.cache.stats().await?;
                lines.push("Workspace Status:".to_string());
                lines.push(format!("Cache: {} files ({} bytes)", stats.files, stats.total_bytes));
                lines.push(format!("Recent activity: {} files cached in the last hour", stats.recent));
                Ok(ToolResult::text(lines.join("\n")).with_data(serde_json::to_value(&stats)?))
            }
            "list-cache" => {
                let files = self.cache.list().await?;
                lines.push("Cache Files:".to_string());
                if files.is_empty() {
                    lines.push("No cache files found".to_string());
                }
                lines.extend(files.iter().map(|f| f.name.clone()));

                let now = SystemTime::now();
                lines.push(String::new());
                lines.push("Recent cache files (last 4 hours):".to_string());
                lines.extend(
                    files
                        .iter()
                        .filter(|f| now.duration_since(f.modified).unwrap_or(Duration::ZERO) < RECENT_LISTING)
                        .map(|f| format!("{} {} {}", f.name, f.size, format_time(f.modified))),
                );
                Ok(ToolResult::text(lines.join("\n")).with_data(serde_json::to_value(&files)?))
            }
            "cleanup" => {
                let removed = self.cache.invalidate_older_than(CLEANUP_AGE).await?;
                let remaining = self.cache.list().await?.len();
                lines.push(format!("Cleaned {} old cache files (>24 hours)", removed));
                lines.push(format!("Remaining cache files: {}", remaining));
                Ok(ToolResult::text(lines.join("\n"))
                    .with_data(json!({"removed": removed, "remaining": remaining})))
            }
            "clear-cache" => {
                let removed = self.cache.clear().await?;
                lines.push(format!("Cleared {} cache files", removed));
                Ok(ToolResult::text(lines.join("\n")).with_data(json!({"removed": removed})))
            }
            "stats" => {
                let stats = self.cache.stats().await?;
                let count = |prefix: &str| stats.by_prefix.get(prefix).copied().unwrap_or(0);
                lines.push("Cache Statistics:".to_string());
                lines.push(format!("Application cache files: {}", count("apps")));
                lines.push(format!("Cluster cache files: {}", count("clusters")));
                lines.push(format!("Repository cache files: {}", count("repos")));
                lines.push(format!("Individual app cache files: {}", count("app")));
                lines.push(format!("Resource tree cache files: {}", count("resources")));
                Ok(ToolResult::text(lines.join("\n")).with_data(serde_json::to_value(&stats)?))
            }
            other => {
                lines.push(format!("Unknown action: {}", other));
                lines.push(String::new());
                lines.push("Available actions:".to_string());
                lines.push("- status/info - Show workspace status".to_string());
                lines.push("- list-cache - List cached files".to_string());
                lines.push("- cleanup - Clean old cache files (>24 hours)".to_string());
                lines.push("- clear-cache - Clear all cache files".to_string());
                lines.push("- stats - Show cache statistics by type".to_string());
                Ok(ToolResult::error(lines.join("\n")))
            }
        }
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tools_registered() {
        let tools = ArgoCDTools::all(&ToolsConfig::default());
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "argocd_list_applications",
                "argocd_get_application",
                "argocd_list_clusters",
                "argocd_list_repositories",
                "argocd_sync_application",
                "argocd_application_history",
                "argocd_workspace_manager",
            ]
        );
        assert!(tools[0].spec().secrets.contains(&"ARGOCD_TOKEN".to_string()));
    }

    #[test]
    fn test_parse_sync_resources() {
        let parsed = parse_sync_resources("Deployment/web, Service/web").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["kind"], "Deployment");
        assert_eq!(parsed[1]["name"], "web");
        assert!(parse_sync_resources("Deployment").is_err());
        assert!(parse_sync_resources("/web").is_err());
    }

    #[test]
    fn test_error_hints() {
        let response = HttpResponse {
            status: 401,
            body: Bytes::new(),
            elapsed: Duration::ZERO,
        };
        let err = handle_argocd_error(&response);
        assert!(err.to_string().contains("argocd account generate-token"));

        let response = HttpResponse {
            status: 404,
            body: Bytes::from_static(br#"{"message":"applications.argoproj.io \"x\" not found"}"#),
            elapsed: Duration::ZERO,
        };
        assert!(handle_argocd_error(&response).to_string().contains("not found"));
    }

    #[test]
    fn test_find_history_entry() {
        let history = vec![
            json!({"id": 3, "revision": "abcdef1234567890"}),
            json!({"id": 2, "revision": "0123456789abcdef"}),
        ];
        assert_eq!(history_id(find_history_entry(&history, "2").unwrap()), Some(2));
        assert_eq!(history_id(find_history_entry(&history, "abcdef1").unwrap()), Some(3));
        assert!(find_history_entry(&history, "abc").is_none());
    }

    #[test]
    fn test_detailed_view_caps_resources() {
        let app = json!({"metadata": {"name": "guestbook"}});
        let nodes: Vec<Value> = (0..25)
            .map(|i| json!({"kind": "Pod", "name": format!("pod-{}", i), "health": {"status": "Healthy"}}))
            .collect();
        let tree = json!({ "nodes": nodes });
        let text = render_application_detailed(&app, Some(&tree));
        assert!(text.contains("Pod/pod-19 - Healthy"));
        assert!(!text.contains("pod-20"));
        assert!(text.contains("... and 5 more resources"));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_config_error() {
        let tool = ArgoCDListClustersTool::new(&ToolsConfig::default());
        let err = tool
            .execute(ToolInput::new().without_process_env())
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ARGOCD_TOKEN"));
    }

    #[tokio::test]
    async fn test_workspace_manager_actions() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolsConfig::default().with_workspace(dir.path());
        let cache = config.cache_for(WORKSPACE_TOOL);
        cache
            .put(&crate::cache::derive_key::<&str>("clusters", &[], "2024060112"), b"{}")
            .await
            .unwrap();

        let tool = ArgoCDWorkspaceManagerTool::new(&config);
        let stats = tool
            .execute(ToolInput::new().with_arg("action", "stats"))
            .await
            .unwrap();
        assert!(stats.output.contains("Cluster cache files: 1"));

        let cleared = tool
            .execute(ToolInput::new().with_arg("action", "clear-cache"))
            .await
            .unwrap();
        assert!(cleared.output.contains("Cleared 1 cache files"));

        let unknown = tool
            .execute(ToolInput::new().with_arg("action", "explode"))
            .await
            .unwrap();
        assert!(!unknown.success);
        assert!(unknown.output.contains("Available actions"));
    }
}
