//! Tool abstractions: inputs, results, and the executable tool trait

mod spec;

pub use spec::{Arg, FileSpec, ToolDefinition, ToolSpec, ToolType};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::{KubiyaError, KubiyaResult};

/// Arguments and environment for a single tool invocation.
///
/// Argument values are plain strings, matching how the platform passes them
/// to containers. The environment overlay is consulted before the process
/// environment, so credentials can be supplied per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    #[serde(skip)]
    env: BTreeMap<String, String>,
    #[serde(skip, default = "inherit_default")]
    inherit_env: bool,
}

fn inherit_default() -> bool {
    true
}

impl Default for ToolInput {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolInput {
    pub fn new() -> Self {
        Self {
            args: BTreeMap::new(),
            env: BTreeMap::new(),
            inherit_env: true,
        }
    }

    /// Build from a JSON object. Scalars are stringified; `null` is dropped.
    pub fn from_json(value: serde_json::Value) -> KubiyaResult<Self> {
        let object = match value {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(KubiyaError::invalid_argument(format!(
                    "Tool arguments must be a JSON object, got: {}",
                    other
                )))
            }
        };

        let mut input = Self::new();
        for (key, value) in object {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            input.args.insert(key, text);
        }
        Ok(input)
    }

    pub fn with_arg(mut self, name: &str, value: impl Into<String>) -> Self {
        self.args.insert(name.to_string(), value.into());
        self
    }

    pub fn with_env(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.insert(name.to_string(), value.into());
        self
    }

    /// Only consult the overlay, never the process environment
    pub fn without_process_env(mut self) -> Self {
        self.inherit_env = false;
        self
    }

    /// Required, non-empty argument
    pub fn get_arg(&self, name: &str) -> KubiyaResult<String> {
        self.opt_arg(name).ok_or_else(|| {
            KubiyaError::invalid_argument(format!("Missing required argument: {}", name))
        })
    }

    /// Argument value if present and non-empty
    pub fn opt_arg(&self, name: &str) -> Option<String> {
        self.args
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn arg_or(&self, name: &str, default: &str) -> String {
        self.opt_arg(name).unwrap_or_else(|| default.to_string())
    }

    /// Parse a `true`/`false` style flag; anything unrecognised is `false`
    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.opt_arg(name) {
            Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
            None => default,
        }
    }

    /// Parse an argument, falling back to `default` when absent
    pub fn parse_arg<T: FromStr>(&self, name: &str, default: T) -> KubiyaResult<T> {
        match self.opt_arg(name) {
            Some(raw) => raw.parse().map_err(|_| {
                KubiyaError::invalid_argument(format!("Invalid value for {}: '{}'", name, raw))
            }),
            None => Ok(default),
        }
    }

    /// Look up an environment variable, overlay first
    pub fn env_var(&self, name: &str) -> Option<String> {
        if let Some(v) = self.env.get(name).filter(|v| !v.is_empty()) {
            return Some(v.clone());
        }
        if self.inherit_env {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        } else {
            None
        }
    }

    /// Required environment variable with a guidance message when unset
    pub fn require_env(&self, name: &str, hint: &str) -> KubiyaResult<String> {
        self.env_var(name).ok_or_else(|| {
            KubiyaError::config(format!("{} environment variable is required. {}", name, hint))
        })
    }

    /// Overlay variables, for handing to child processes
    pub fn env_overlay(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn inherits_process_env(&self) -> bool {
        self.inherit_env
    }
}

/// Outcome of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Human-readable output shown to the agent
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub exit_code: i32,
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl ToolResult {
    /// Successful result with text output
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
            error: None,
            exit_code: 0,
            execution_time_ms: 0,
        }
    }

    /// Failed result with exit code 1
    pub fn error(message: impl Into<String>) -> Self {
        Self::failure(message, 1)
    }

    pub fn failure(message: impl Into<String>, exit_code: i32) -> Self {
        let message = message.into();
        Self {
            success: false,
            output: message.clone(),
            data: None,
            error: Some(message),
            exit_code: if exit_code == 0 { 1 } else { exit_code },
            execution_time_ms: 0,
        }
    }

    pub fn from_error(err: &KubiyaError) -> Self {
        Self::failure(err.to_string(), err.exit_code())
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = ms;
        self
    }
}

/// Executable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool. Vendor-level failures are returned as unsuccessful
    /// [`ToolResult`]s; `Err` is reserved for failures of the tool itself.
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult>;

    fn spec(&self) -> &ToolSpec;

    fn name(&self) -> &str {
        &self.spec().name
    }

    fn definition(&self) -> ToolDefinition {
        self.spec().definition()
    }
}

/// Something that can resolve and execute tools by name
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute_tool(&self, name: &str, input: ToolInput) -> KubiyaResult<ToolResult>;

    fn list_tools(&self) -> Vec<ToolDefinition>;

    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>>;
}
