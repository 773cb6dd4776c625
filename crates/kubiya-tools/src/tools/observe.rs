//! Observe Tools
//!
//! A single command-style tool over the Observe REST API.
//!
//! ## Available Tools
//!
//! - `observe_api_command` - Dataset, monitor, mute rule, and reference table
//!   operations, OPAL queries, and validated raw API calls
//!
//! ## Commands
//!
//! ```text
//! dataset list | dataset show <id>
//! monitors list | monitors show <id>
//! monitor-mute-rules list | monitor-mute-rules show <id>
//! referencetables list | referencetables show <id>
//! query <dataset-id> <opal>
//! advanced-query <dataset-id> [--startTime T] [--endTime T] [--interval D] [--opal Q]
//! api <METHOD> <endpoint> [query-params] [body]
//! ```
//!
//! ## Authentication
//!
//! `Authorization: Bearer <OBSERVE_CUSTOMER_ID> <OBSERVE_API_KEY>` against
//! `https://<OBSERVE_CUSTOMER_ID>.observeinc.com`. `OBSERVE_BASE_URL`
//! replaces the derived host.

use async_trait::async_trait;
use bytes::Bytes;
use kubiya_core::{
    Arg, KubiyaError, KubiyaResult, Tool, ToolInput, ToolResult, ToolSpec, ToolType, DEFAULT_IMAGE,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::cache::{fetch_or_cache, CacheRequest, FileCache, TimeBucket};
use crate::config::ToolsConfig;
use crate::http::{send, ApiClient, Auth, HttpResponse};
use crate::output::{pretty_or_raw, truncate, MAX_OUTPUT_CHARS, MAX_OUTPUT_LINES};

const OBSERVE_ICON_URL: &str = "https://www.observeinc.com/wp-content/uploads/2022/06/observe-logo.svg";

/// Workspace directory name (`<workspace>/observe-data`)
pub const WORKSPACE_TOOL: &str = "observe";

const LIST_TTL: Duration = Duration::from_secs(15 * 60);

const QUERY_PATH: &str = "/v1/meta/export/query";

/// Supported endpoints, path parameters written as `{id}`
const VALID_ENDPOINTS: &[(&str, &str)] = &[
    ("/v1/login", "POST"),
    ("/v1/login/delegated", "POST"),
    ("/v1/login/delegated/{id}", "GET"),
    ("/v1/meta/export/query", "POST"),
    ("/v1/meta/export/query/page", "GET"),
    ("/v1/meta/export/worksheet/{id}", "POST"),
    ("/v1/meta/reftable", "GET"),
    ("/v1/meta/reftable", "POST"),
    ("/v1/meta/reftable/{id}", "GET"),
    ("/v1/meta/reftable/{id}", "PUT"),
    ("/v1/meta/reftable/{id}", "DELETE"),
    ("/v1/dataset", "GET"),
    ("/v1/dataset/{id}", "GET"),
    ("/v1/monitors", "GET"),
    ("/v1/monitors", "POST"),
    ("/v1/monitors/{id}", "GET"),
    ("/v1/monitors/{id}", "PATCH"),
    ("/v1/monitors/{id}", "DELETE"),
    ("/v1/monitor-mute-rules", "GET"),
    ("/v1/monitor-mute-rules", "POST"),
    ("/v1/monitor-mute-rules/{id}", "GET"),
    ("/v1/monitor-mute-rules/{id}", "DELETE"),
    ("/v1/referencetables", "GET"),
    ("/v1/referencetables", "POST"),
    ("/v1/referencetables/{id}", "GET"),
    ("/v1/referencetables/{id}", "PATCH"),
    ("/v1/referencetables/{id}", "DELETE"),
    ("/v1/referencetables/{id}", "PUT"),
];

const USAGE: &str = "Usage examples:
  'dataset list' - List all datasets
  'dataset show <dataset-id>' - Show dataset details
  'monitors list' - List all monitors
  'monitors show <monitor-id>' - Show monitor details
  'monitor-mute-rules list' - List all monitor mute rules
  'monitor-mute-rules show <mute-rule-id>' - Show monitor mute rule details
  'referencetables list' - List all reference tables
  'referencetables show <table-id>' - Show reference table details
  'query <dataset-id> <opal-query>' - Execute OPAL query
  'api <method> <endpoint> [query-params] [body]' - Custom API call
  'advanced-query <dataset-id> [options]' - Advanced query with time range and OPAL";

const ADVANCED_USAGE: &str = "Usage: advanced-query <dataset-id> [options]

Options:
  --startTime <ISO8601>    Start time (e.g. 2023-04-20T16:20:00Z)
  --endTime <ISO8601>      End time (e.g. 2023-04-20T16:30:00Z)
  --interval <duration>    Interval (e.g. 1h, 10m)
  --opal <opal-statement>  OPAL statement";

/// Collection of all Observe tools
pub struct ObserveTools;

impl ObserveTools {
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![Box::new(ObserveApiCommandTool::new(config))]
    }
}

// ============================================================================
// Command parsing
// ============================================================================

/// Listable/showable Observe resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveResource {
    Datasets,
    Monitors,
    MonitorMuteRules,
    ReferenceTables,
}

impl ObserveResource {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "dataset" | "datasets" => Some(Self::Datasets),
            "monitors" | "monitor" => Some(Self::Monitors),
            "monitor-mute-rules" => Some(Self::MonitorMuteRules),
            "referencetables" => Some(Self::ReferenceTables),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Datasets => "/v1/dataset",
            Self::Monitors => "/v1/monitors",
            Self::MonitorMuteRules => "/v1/monitor-mute-rules",
            Self::ReferenceTables => "/v1/referencetables",
        }
    }

    /// Command word, also the cache operation name of its list call
    pub fn command(&self) -> &'static str {
        match self {
            Self::Datasets => "dataset",
            Self::Monitors => "monitors",
            Self::MonitorMuteRules => "monitor-mute-rules",
            Self::ReferenceTables => "referencetables",
        }
    }

    fn id_label(&self) -> &'static str {
        match self {
            Self::Datasets => "Dataset ID",
            Self::Monitors => "Monitor ID",
            Self::MonitorMuteRules => "Mute Rule ID",
            Self::ReferenceTables => "Reference Table ID",
        }
    }
}

/// Parsed `command` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserveCommand {
    List(ObserveResource),
    Show(ObserveResource, String),
    Query {
        dataset: String,
        opal: String,
    },
    AdvancedQuery {
        dataset: String,
        start_time: Option<String>,
        end_time: Option<String>,
        interval: Option<String>,
        opal: Option<String>,
    },
    Api {
        method: String,
        endpoint: String,
        query: Option<String>,
        body: Option<String>,
    },
}

impl ObserveCommand {
    pub fn parse(command: &str) -> KubiyaResult<Self> {
        let words = split_command(command)?;
        let Some(operation) = words.first() else {
            return Err(KubiyaError::invalid_argument(format!(
                "Command is required\n{}",
                USAGE
            )));
        };

        if let Some(resource) = ObserveResource::parse(operation) {
            return match words.get(1).map(String::as_str) {
                Some("list") => Ok(Self::List(resource)),
                Some("show") => match words.get(2) {
                    Some(id) if id == "." || id == ".." => Err(KubiyaError::invalid_argument(format!(
                        "Invalid {}: {}",
                        resource.id_label(),
                        id
                    ))),
                    Some(id) => Ok(Self::Show(resource, id.clone())),
                    None => Err(KubiyaError::invalid_argument(format!(
                        "{} is required for '{} show'\nHint: Use '{} list' to see available IDs first.",
                        resource.id_label(),
                        resource.command(),
                        resource.command()
                    ))),
                },
                other => Err(KubiyaError::invalid_argument(format!(
                    "Unknown {} operation: {}\nSupported: list, show",
                    resource.command(),
                    other.unwrap_or("")
                ))),
            };
        }

        match operation.as_str() {
            "query" => {
                if words.len() < 3 {
                    return Err(KubiyaError::invalid_argument(
                        "Query requires dataset ID and OPAL query\n\
                         Usage: query <dataset-id> <opal-query>\n\
                         Hint: Use 'dataset list' to see available dataset IDs first.",
                    ));
                }
                Ok(Self::Query {
                    dataset: words[1].clone(),
                    opal: words[2..].join(" "),
                })
            }
            "advanced-query" => {
                let dataset = words.get(1).cloned().ok_or_else(|| {
                    KubiyaError::invalid_argument(format!(
                        "Advanced query requires dataset ID\n{}",
                        ADVANCED_USAGE
                    ))
                })?;
                let (mut start_time, mut end_time, mut interval, mut opal) = (None, None, None, None);
                let mut rest = words[2..].iter();
                while let Some(flag) = rest.next() {
                    let slot = match flag.as_str() {
                        "--startTime" => &mut start_time,
                        "--endTime" => &mut end_time,
                        "--interval" => &mut interval,
                        "--opal" => &mut opal,
                        other => {
                            return Err(KubiyaError::invalid_argument(format!(
                                "Unknown option {}\n{}",
                                other, ADVANCED_USAGE
                            )))
                        }
                    };
                    let value = rest.next().ok_or_else(|| {
                        KubiyaError::invalid_argument(format!("Option {} requires a value", flag))
                    })?;
                    *slot = Some(value.clone());
                }
                Ok(Self::AdvancedQuery {
                    dataset,
                    start_time,
                    end_time,
                    interval,
                    opal,
                })
            }
            "api" => {
                if words.len() < 3 {
                    return Err(KubiyaError::invalid_argument(format!(
                        "API call requires method and endpoint\n\
                         Usage: api <method> <endpoint> [query-params] [body]\n{}",
                        supported_endpoints()
                    )));
                }
                let method = words[1].to_ascii_uppercase();
                let endpoint = words[2].clone();
                if !is_valid_api(&method, &endpoint) {
                    return Err(KubiyaError::invalid_argument(format!(
                        "Invalid API endpoint or method: {} {}\n{}\nHint: Did you mean one of these?\n{}",
                        method,
                        endpoint,
                        supported_endpoints(),
                        suggest_endpoints(&method, &endpoint)
                    )));
                }
                Ok(Self::Api {
                    method,
                    endpoint,
                    query: words.get(3).cloned().filter(|q| !q.is_empty()),
                    body: words.get(4).cloned().filter(|b| !b.is_empty()),
                })
            }
            other => Err(KubiyaError::invalid_argument(format!(
                "Unknown operation: {}\n\
                 Supported operations: dataset, monitors, monitor-mute-rules, referencetables, query, api, advanced-query\n\
                 Hint: Try 'dataset list', 'monitors list', or 'api GET /v1/dataset'",
                other
            ))),
        }
    }

    /// First command word
    pub fn operation(&self) -> &str {
        match self {
            Self::List(r) | Self::Show(r, _) => r.command(),
            Self::Query { .. } => "query",
            Self::AdvancedQuery { .. } => "advanced-query",
            Self::Api { .. } => "api",
        }
    }

    /// Second command word, where it has one
    pub fn sub_operation(&self) -> &str {
        match self {
            Self::List(_) => "list",
            Self::Show(..) => "show",
            Self::Query { dataset, .. } | Self::AdvancedQuery { dataset, .. } => dataset.as_str(),
            Self::Api { method, .. } => method.as_str(),
        }
    }
}

/// Split a command line into words. Single and double quotes group words;
/// backslash escapes the next character outside single quotes.
pub fn split_command(command: &str) -> KubiyaResult<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('"'), '"') => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(KubiyaError::invalid_argument("Unterminated quote in command"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Replace numeric and hex/uuid-like path segments with `{id}`, drop any query
pub fn normalize_endpoint(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or_default();
    path.split('/')
        .map(|segment| {
            let numeric = !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit());
            let hex_id = segment.len() >= 8
                && segment
                    .chars()
                    .all(|c| matches!(c, '0'..='9' | 'a'..='f' | '-'));
            if numeric || hex_id {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn is_valid_api(method: &str, endpoint: &str) -> bool {
    let normalized = normalize_endpoint(endpoint);
    VALID_ENDPOINTS
        .iter()
        .any(|(path, m)| *path == normalized && m.eq_ignore_ascii_case(method))
}

fn supported_endpoints() -> String {
    let mut out = String::from("Supported API endpoints and methods:");
    for (path, method) in VALID_ENDPOINTS {
        out.push_str(&format!("\n  {} {}", method, path));
    }
    out
}

/// Same path with other methods, else same resource root, else same method
fn suggest_endpoints(method: &str, endpoint: &str) -> String {
    let normalized = normalize_endpoint(endpoint);
    let root: String = normalized.split('/').take(3).collect::<Vec<_>>().join("/");
    let render = |entries: Vec<&(&str, &str)>| {
        entries
            .iter()
            .map(|(p, m)| format!("  {} {}", m, p))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let same_path: Vec<_> = VALID_ENDPOINTS.iter().filter(|(p, _)| *p == normalized).collect();
    if !same_path.is_empty() {
        return render(same_path);
    }
    let same_root: Vec<_> = VALID_ENDPOINTS.iter().filter(|(p, _)| p.starts_with(&root)).collect();
    if !same_root.is_empty() && root.len() > 3 {
        return render(same_root);
    }
    let same_method: Vec<_> = VALID_ENDPOINTS
        .iter()
        .filter(|(_, m)| m.eq_ignore_ascii_case(method))
        .collect();
    if !same_method.is_empty() {
        return render(same_method);
    }
    "(see full list above)".to_string()
}

fn query_payload(dataset: &str, opal: &str) -> Value {
    json!({
        "query": {
            "stages": [{
                "input": [{ "datasetId": dataset }],
                "stageID": "main",
                "pipeline": opal,
            }]
        }
    })
}

// ============================================================================
// Status reporting
// ============================================================================

/// Extra guidance for a failed status, depending on what was attempted
fn status_hints(status: u16, command: &ObserveCommand) -> Vec<String> {
    let mut lines: Vec<String> = match status {
        400 => vec!["Bad Request - The request was malformed or invalid".into()],
        401 => vec![
            "Unauthorized - Invalid or missing API key".into(),
            "Please check your OBSERVE_API_KEY environment variable".into(),
        ],
        403 => vec![
            "Forbidden - Insufficient permissions for this operation".into(),
            "Please check your API key permissions".into(),
        ],
        404 => vec![
            "Not Found - The requested resource was not found".into(),
            "Please verify the endpoint or resource ID".into(),
        ],
        409 => vec!["Conflict - The request conflicts with current state".into()],
        422 => vec![
            "Unprocessable Entity - The request was well-formed but contains invalid parameters".into(),
        ],
        429 => vec![
            "Too Many Requests - Rate limit exceeded".into(),
            "Please wait before making additional requests".into(),
        ],
        500 => vec!["Internal Server Error - The server encountered an unexpected condition".into()],
        502 => vec!["Bad Gateway - The server received an invalid response from upstream".into()],
        503 => vec![
            "Service Unavailable - The service is temporarily unavailable".into(),
            "Please try again later".into(),
        ],
        504 => vec!["Gateway Timeout - The server did not receive a timely response".into()],
        s if s >= 500 => vec![format!("Server Error - HTTP {}", s)],
        s => vec![format!("Client Error - HTTP {}", s)],
    };

    let hint: Option<&str> = match (status, command) {
        (404, ObserveCommand::Show(ObserveResource::Datasets, _)) | (404, ObserveCommand::Query { .. }) => {
            Some("Hint: Make sure the dataset ID is correct. Try 'dataset list' to see available datasets first.")
        }
        (404, ObserveCommand::Show(ObserveResource::Monitors, _)) => {
            Some("Hint: Make sure the monitor ID is correct. Try 'monitors list' to see available monitors first.")
        }
        (404, ObserveCommand::Show(ObserveResource::MonitorMuteRules, _)) => Some(
            "Hint: Make sure the mute rule ID is correct. Try 'monitor-mute-rules list' to see available mute rules first.",
        ),
        (404, ObserveCommand::Show(ObserveResource::ReferenceTables, _)) => Some(
            "Hint: Make sure the reference table ID is correct. Try 'referencetables list' to see available reference tables first.",
        ),
        (404, ObserveCommand::Api { .. }) => Some(
            "Hint: Check if the endpoint path is correct. Common endpoints: /v1/dataset, /v1/monitors, /v1/referencetables",
        ),
        (422, ObserveCommand::Query { .. }) => Some(
            "Hint: Check your OPAL query syntax, e.g. 'filter severity == \"error\"' or 'make count()'",
        ),
        (422, ObserveCommand::AdvancedQuery { .. }) => Some(
            "Hint: startTime/endTime must be ISO8601 (e.g. 2023-04-20T16:20:00Z), interval a duration (e.g. 1h, 10m, 30s), and OPAL valid",
        ),
        (422, ObserveCommand::Api { .. }) => Some(
            "Hint: Check that query parameters are URL encoded and the request body is valid JSON",
        ),
        _ => None,
    };
    if let Some(hint) = hint {
        lines.push(String::new());
        lines.push(hint.to_string());
    }
    lines
}

/// `code`, else `error_code`, from a JSON error body
fn error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["code", "error_code"]
        .iter()
        .filter_map(|field| value.get(*field))
        .find_map(|code| match code {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
}

/// Body and status of one call, with whether it came from the cache
struct Reply {
    status: u16,
    body: Bytes,
    elapsed: Option<Duration>,
    cache_file: Option<String>,
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            body: response.body,
            elapsed: Some(response.elapsed),
            cache_file: None,
        }
    }
}

// ============================================================================
// Observe API Command Tool
// ============================================================================

/// Execute Observe API operations
pub struct ObserveApiCommandTool {
    spec: ToolSpec,
    config: ToolsConfig,
    cache: FileCache,
}

impl ObserveApiCommandTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = ToolSpec::new(
            "observe_api_command",
            "Execute any Observe API operation with dynamic parameters and proper response parsing. \
             Only supported API endpoints/methods are allowed; invalid ones get a hint with the correct ones. \
             Large responses are truncated (100 lines or 10,000 characters max). \
             For custom API calls, use: api <METHOD> <ENDPOINT> [query-params] [body]",
            DEFAULT_IMAGE,
        )
        .with_args(vec![
            Arg::required(
                "command",
                "The command to execute. Examples: 'dataset list', 'dataset show <id>', 'monitors list', \
                 'query <dataset-id> \"make count()\"', 'advanced-query <dataset-id> --interval 1h', \
                 'api GET /v1/dataset'",
            ),
            Arg::optional("refresh", "Bypass the cache for list operations: true/false (default: false)")
                .with_default("false"),
        ])
        .with_secrets(&["OBSERVE_API_KEY"])
        .with_env(&["OBSERVE_CUSTOMER_ID"])
        .with_icon(OBSERVE_ICON_URL)
        .with_type(ToolType::Native);

        Self {
            spec,
            config: config.clone(),
            cache: config.cache_for(WORKSPACE_TOOL),
        }
    }

    fn client(&self, input: &ToolInput) -> KubiyaResult<(ApiClient, String)> {
        let key = input.require_env(
            "OBSERVE_API_KEY",
            "Create an API token in Observe under Account Settings > API Tokens.",
        )?;
        let customer = input.require_env(
            "OBSERVE_CUSTOMER_ID",
            "Set it to your Observe customer ID (the subdomain of your Observe URL).",
        )?;
        let base_url = input
            .env_var("OBSERVE_BASE_URL")
            .unwrap_or_else(|| format!("https://{}.observeinc.com", customer));
        let client = ApiClient::new(
            &base_url,
            Auth::Bearer(format!("{} {}", customer, key)),
            self.config.http_timeout(),
            self.config.verify_tls,
        )?;
        Ok((client, base_url))
    }

    async fn call(&self, client: &ApiClient, command: &ObserveCommand, refresh: bool) -> KubiyaResult<Reply> {
        match command {
            ObserveCommand::List(resource) => {
                let request = CacheRequest::new(resource.command(), LIST_TTL, TimeBucket::Hour)
                    .force_refresh(refresh);
                let fetched =
                    fetch_or_cache(&self.cache, &request, || fetch_list(client, resource.path())).await;
                match fetched {
                    Ok(cached) => Ok(Reply {
                        status: 200,
                        cache_file: cached.from_cache().then(|| cached.key.file_name()),
                        body: cached.data,
                        elapsed: None,
                    }),
                    Err(KubiyaError::Http { status, message }) => Ok(Reply {
                        status,
                        body: Bytes::from(message),
                        elapsed: None,
                        cache_file: None,
                    }),
                    Err(e) => Err(e),
                }
            }
            ObserveCommand::Show(resource, id) => {
                let path = format!("{}/{}", resource.path(), urlencoding::encode(id));
                Ok(send(client.get(&path)).await?.into())
            }
            ObserveCommand::Query { dataset, opal } => {
                let payload = query_payload(dataset, opal);
                Ok(send(client.post(QUERY_PATH).json(&payload)).await?.into())
            }
            ObserveCommand::AdvancedQuery {
                dataset,
                start_time,
                end_time,
                interval,
                opal,
            } => {
                let payload = query_payload(dataset, opal.as_deref().unwrap_or_default());
                let query: Vec<(&str, &String)> = [
                    ("startTime", start_time),
                    ("endTime", end_time),
                    ("interval", interval),
                ]
                .into_iter()
                .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
                .collect();
                Ok(send(client.post(QUERY_PATH).query(&query).json(&payload)).await?.into())
            }
            ObserveCommand::Api {
                method,
                endpoint,
                query,
                body,
            } => {
                let method = Method::from_bytes(method.as_bytes()).map_err(|_| {
                    KubiyaError::invalid_argument(format!("Invalid HTTP method: {}", method))
                })?;
                let path = match query {
                    Some(q) => format!("{}?{}", endpoint, q.trim_start_matches('?')),
                    None => endpoint.clone(),
                };
                let mut request = client.request(method, &path);
                if let Some(body) = body {
                    request = request.body(body.clone());
                }
                Ok(send(request).await?.into())
            }
        }
    }
}

/// GET a list endpoint; non-2xx bodies become errors so they are never cached
async fn fetch_list(client: &ApiClient, path: &str) -> KubiyaResult<Bytes> {
    let response = send(client.get(path)).await?;
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(KubiyaError::http(response.status, response.text()))
    }
}

fn describe_action(command: &ObserveCommand) -> String {
    match command {
        ObserveCommand::List(ObserveResource::Datasets) => "Listing datasets...".to_string(),
        ObserveCommand::List(ObserveResource::Monitors) => "Listing monitors...".to_string(),
        ObserveCommand::List(ObserveResource::MonitorMuteRules) => "Listing monitor mute rules...".to_string(),
        ObserveCommand::List(ObserveResource::ReferenceTables) => "Listing reference tables...".to_string(),
        ObserveCommand::Show(resource, id) => format!("Showing {}: {}", resource.command(), id),
        ObserveCommand::Query { dataset, opal } => {
            format!("Executing OPAL query on dataset: {}\nQuery: {}", dataset, opal)
        }
        ObserveCommand::AdvancedQuery { dataset, .. } => {
            format!("Executing advanced query on dataset: {}", dataset)
        }
        ObserveCommand::Api { method, endpoint, .. } => {
            format!("Making API call: {} {}", method, endpoint)
        }
    }
}

#[async_trait]
impl Tool for ObserveApiCommandTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        let (client, base_url) = self.client(&input)?;
        let raw = input.opt_arg("command").ok_or_else(|| {
            KubiyaError::invalid_argument(format!("Command is required\n{}", USAGE))
        })?;
        let command = ObserveCommand::parse(&raw)?;
        let refresh = input.flag("refresh", false);

        debug!(operation = command.operation(), "Running Observe command");

        let mut lines = vec![
            "=== Observe API Operation ===".to_string(),
            format!("Command: {}", raw),
            format!("Operation: {}", command.operation()),
            format!("Sub-operation: {}", command.sub_operation()),
            String::new(),
            describe_action(&command),
        ];

        let reply = match self.call(&client, &command, refresh).await {
            Ok(reply) => reply,
            Err(e) => {
                lines.push("Error: Failed to execute API call".to_string());
                lines.push(String::new());
                lines.push(format!("Base URL: {}", base_url));
                lines.push(e.to_string());
                lines.push(String::new());
                lines.push("=== Troubleshooting Steps ===".to_string());
                lines.push("1. Check if OBSERVE_API_KEY is set correctly".to_string());
                lines.push("2. Check if OBSERVE_CUSTOMER_ID is set correctly".to_string());
                lines.push(format!("3. Verify network connectivity to {}", base_url));
                lines.push("4. Check if the endpoint exists and is accessible".to_string());
                lines.push(
                    "5. Ensure Bearer token format is correct: 'Bearer <customerid> <token>'".to_string(),
                );
                return Ok(ToolResult::failure(lines.join("\n"), e.exit_code()));
            }
        };

        let body_text = String::from_utf8_lossy(&reply.body).to_string();
        lines.push(String::new());
        lines.push("=== Response ===".to_string());
        lines.push(format!("HTTP Status: {}", reply.status));
        match (&reply.cache_file, reply.elapsed) {
            (Some(file), _) => lines.push(format!("Served from cache: {}", file)),
            (None, Some(elapsed)) => {
                lines.push(format!("Response Time: {:.3}s", elapsed.as_secs_f64()))
            }
            (None, None) => {}
        }
        lines.push(String::new());

        if (200..300).contains(&reply.status) {
            lines.push(format!("Success ({})", reply.status));
            lines.push(String::new());
            let cut = truncate(&pretty_or_raw(&body_text), MAX_OUTPUT_LINES, MAX_OUTPUT_CHARS);
            lines.extend(cut.notices.iter().cloned());
            lines.push(cut.text);

            let data = json!({
                "status": reply.status,
                "cached": reply.cache_file.is_some(),
                "truncated": !cut.notices.is_empty(),
            });
            return Ok(ToolResult::text(lines.join("\n")).with_data(data));
        }

        if reply.status < 400 {
            lines.push(format!("Unexpected Status ({})", reply.status));
            lines.push(String::new());
            lines.push("=== Response Details ===".to_string());
            lines.push(pretty_or_raw(&body_text));
            return Ok(ToolResult::text(lines.join("\n")).with_data(json!({"status": reply.status})));
        }

        let class = if reply.status >= 500 { "Server Error" } else { "Client Error" };
        lines.push(format!("{} ({})", class, reply.status));
        lines.push(String::new());
        lines.push("=== Error Details ===".to_string());
        lines.extend(status_hints(reply.status, &command));

        let response = HttpResponse {
            status: reply.status,
            body: reply.body.clone(),
            elapsed: reply.elapsed.unwrap_or_default(),
        };
        if let Some(message) = response.error_message() {
            lines.push(String::new());
            lines.push(format!("Error Message: {}", message));
        }
        if reply.status < 500 {
            if let Some(code) = error_code(&body_text) {
                lines.push(format!("Error Code: {}", code));
            }
        }
        lines.push(String::new());
        lines.push("=== Full Error Response ===".to_string());
        lines.push(pretty_or_raw(&body_text));

        Ok(ToolResult::failure(lines.join("\n"), 1).with_data(json!({"status": reply.status})))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}
