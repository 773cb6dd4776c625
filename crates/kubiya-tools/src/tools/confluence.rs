//! Confluence Tools
//!
//! ## Available Tools
//!
//! - `confluence_search` - CQL full-text search across spaces
//!
//! Credentials come from the `CONFLUENCE_URL`, `CONFLUENCE_USERNAME` and
//! `CONFLUENCE_API_TOKEN` secrets and are sent as HTTP basic auth.

use async_trait::async_trait;
use kubiya_core::{Arg, KubiyaError, KubiyaResult, Tool, ToolInput, ToolResult, ToolSpec, ToolType};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::ToolsConfig;
use crate::http::{send, ApiClient, Auth};
use crate::output::ellipsize;

const CONFLUENCE_ICON_URL: &str = "https://wac-cdn.atlassian.com/assets/img/favicons/confluence/favicon.png";
const CONFLUENCE_IMAGE: &str = "python:3.11-slim";

const EXCERPT_CHARS: usize = 200;
const RULE: &str = "============================================================";

/// Collection of all Confluence tools
pub struct ConfluenceTools;

impl ConfluenceTools {
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![Box::new(ConfluenceSearchTool::new(config))]
    }
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize, Default)]
struct SearchResult {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    excerpt: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    space: Space,
}

#[derive(Debug, Deserialize, Default)]
struct Space {
    key: Option<String>,
    name: Option<String>,
}

/// CQL text search, optionally restricted to one space
pub fn build_cql(query: &str, space_key: Option<&str>) -> String {
    let escape = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");
    let mut cql = format!("text ~ \"{}\"", escape(query));
    if let Some(space) = space_key {
        cql.push_str(&format!(" and space = \"{}\"", escape(space)));
    }
    cql
}

/// `<base>/display/<space>/<Title+With+Plus>`
pub fn page_url(base_url: &str, space_key: &str, title: &str) -> String {
    format!("{}/display/{}/{}", base_url, space_key, title.replace(' ', "+"))
}

/// Excerpt text without markup, entities decoded
pub fn clean_excerpt(html: &str) -> String {
    let text = Regex::new(r"<[^>]*>")
        .map(|tags| tags.replace_all(html, "").into_owned())
        .unwrap_or_else(|_| html.to_string());
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

// ============================================================================
// Confluence Search Tool
// ============================================================================

pub struct ConfluenceSearchTool {
    spec: ToolSpec,
    config: ToolsConfig,
}

impl ConfluenceSearchTool {
    pub fn new(config: &ToolsConfig) -> Self {
        let spec = ToolSpec::new(
            "confluence_search",
            "Search through Confluence spaces using a search query. Provide a search query and optionally \
             specify a space key to limit the search to a specific space. Returns matching pages with \
             titles, excerpts, and URLs.",
            CONFLUENCE_IMAGE,
        )
        .with_args(vec![
            Arg::required(
                "query",
                "The search query to find relevant pages in Confluence. Examples: 'API documentation', \
                 'user authentication', 'troubleshooting guide'",
            ),
            Arg::optional(
                "space_key",
                "Optional: Confluence space key to limit search to a specific space (e.g., 'DEV', 'DOCS')",
            ),
            Arg::optional("limit", "Optional: Maximum number of results to return (default: 10)")
                .with_default("10"),
        ])
        .with_secrets(&["CONFLUENCE_URL", "CONFLUENCE_USERNAME", "CONFLUENCE_API_TOKEN"])
        .with_icon(CONFLUENCE_ICON_URL)
        .with_type(ToolType::Native);

        Self {
            spec,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Tool for ConfluenceSearchTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        let base_url = input.require_env("CONFLUENCE_URL", "Set it to your Confluence base URL.")?;
        let username = input.require_env("CONFLUENCE_USERNAME", "Set it to the account email.")?;
        let api_token = input.require_env(
            "CONFLUENCE_API_TOKEN",
            "Create one at https://id.atlassian.com/manage-profile/security/api-tokens",
        )?;
        let query = input.opt_arg("query").ok_or_else(|| {
            KubiyaError::invalid_argument(
                "Search query is required. Examples: query='API documentation', \
                 query='user authentication' space_key='DEV'",
            )
        })?;
        let space_key = input.opt_arg("space_key");
        let limit: u32 = input.parse_arg("limit", 10)?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let client = ApiClient::new(
            &base_url,
            Auth::Basic {
                username,
                password: api_token,
            },
            self.config.http_timeout(),
            self.config.verify_tls,
        )?;

        let cql = build_cql(&query, space_key.as_deref());
        debug!(cql = %cql, limit, "Searching Confluence");

        let mut lines = vec![format!("Searching Confluence for: '{}'", query)];
        if let Some(space) = &space_key {
            lines.push(format!("In space: {}", space));
        }
        lines.push(format!("URL: {}", base_url));
        lines.push(RULE.to_string());

        let limit_param = limit.to_string();
        let request = client.get("/rest/api/search").query(&[
            ("cql", cql.as_str()),
            ("limit", limit_param.as_str()),
            ("expand", "content.space,content.version,content.body.view"),
        ]);
        let response = match send(request).await {
            Ok(r) => r,
            Err(e) => {
                lines.push(format!("Network error: {}", e));
                return Ok(ToolResult::failure(lines.join("\n"), e.exit_code()));
            }
        };

        match response.status {
            200 => {}
            401 => {
                lines.push("Authentication failed. Please check your credentials.".to_string());
                return Ok(ToolResult::failure(lines.join("\n"), 1));
            }
            404 => {
                lines.push("Confluence instance not found. Please check the URL.".to_string());
                return Ok(ToolResult::failure(lines.join("\n"), 1));
            }
            status => {
                lines.push(format!("API request failed with status {}", status));
                lines.push(format!("Response: {}", response.text()));
                return Ok(ToolResult::failure(lines.join("\n"), 1));
            }
        }

        let parsed: SearchResponse = match serde_json::from_slice(&response.body) {
            Ok(p) => p,
            Err(e) => {
                lines.push(format!("Unexpected error: {}", e));
                return Ok(ToolResult::failure(lines.join("\n"), 1));
            }
        };

        if parsed.results.is_empty() {
            lines.push("No results found for your search query.".to_string());
            return Ok(ToolResult::text(lines.join("\n")).with_data(json!({"results": []})));
        }

        lines.push(format!("Found {} result(s):", parsed.results.len()));
        lines.push(String::new());

        let mut data = Vec::with_capacity(parsed.results.len());
        for (i, result) in parsed.results.iter().enumerate() {
            let content = &result.content;
            let title = content.title.as_deref().unwrap_or("No title");
            let url = page_url(
                &base_url,
                content.space.key.as_deref().unwrap_or(""),
                content.title.as_deref().unwrap_or(""),
            );
            let excerpt = result
                .excerpt
                .as_deref()
                .map(clean_excerpt)
                .filter(|e| !e.is_empty());

            lines.push(format!("Result #{}", i + 1));
            lines.push(format!("   Title: {}", title));
            lines.push(format!(
                "   Space: {}",
                content.space.name.as_deref().unwrap_or("Unknown space")
            ));
            lines.push(format!("   Type: {}", content.kind.as_deref().unwrap_or("page")));
            lines.push(format!("   URL: {}", url));
            if let Some(excerpt) = &excerpt {
                lines.push(format!("   Excerpt: {}", ellipsize(excerpt, EXCERPT_CHARS)));
            }
            lines.push(String::new());

            data.push(json!({
                "title": title,
                "space": content.space.name,
                "type": content.kind.as_deref().unwrap_or("page"),
                "url": url,
                "excerpt": excerpt,
            }));
        }

        lines.push(RULE.to_string());
        lines.push(format!(
            "Search completed successfully. Found {} result(s).",
            parsed.results.len()
        ));

        Ok(ToolResult::text(lines.join("\n")).with_data(json!({ "results": data })))
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}
