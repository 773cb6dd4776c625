//! Declarative tool definitions
//!
//! A [`ToolSpec`] is the data record an agent platform needs to run a tool:
//! name, description, string arguments, container image, and optionally the
//! shell script payload executed by an external runner.

use serde::{Deserialize, Serialize};

use super::ToolInput;
use crate::{KubiyaError, KubiyaResult};

/// A single declared tool argument. All values are strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Arg {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            default: None,
        }
    }

    /// Attach a default that is documented in the schema
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// File copied into the tool container before the script runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub source: String,
    pub destination: String,
}

impl FileSpec {
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }
}

/// How the platform runs a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    /// Script payload executed inside `image`
    #[default]
    Docker,
    /// Implemented in-process
    Native,
}

/// Full tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub args: Vec<Arg>,
    pub image: String,
    #[serde(rename = "type", default)]
    pub tool_type: ToolType,
    /// Shell script payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Secret environment variables the tool needs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
    /// Non-secret environment variables the tool needs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub with_files: Vec<FileSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    300
}

impl ToolSpec {
    pub fn new(name: &str, description: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            args: Vec::new(),
            image: image.to_string(),
            tool_type: ToolType::Docker,
            content: None,
            secrets: Vec::new(),
            env: Vec::new(),
            with_files: Vec::new(),
            icon_url: None,
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_args(mut self, args: Vec<Arg>) -> Self {
        self.args = args;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_secrets(mut self, secrets: &[&str]) -> Self {
        self.secrets = secrets.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_env(mut self, env: &[&str]) -> Self {
        self.env = env.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_files(mut self, files: Vec<FileSpec>) -> Self {
        self.with_files = files;
        self
    }

    pub fn with_icon(mut self, icon_url: &str) -> Self {
        self.icon_url = Some(icon_url.to_string());
        self
    }

    pub fn with_type(mut self, tool_type: ToolType) -> Self {
        self.tool_type = tool_type;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Names of every environment variable the tool requires
    pub fn required_env(&self) -> impl Iterator<Item = &str> {
        self.secrets.iter().chain(self.env.iter()).map(String::as_str)
    }

    /// Names of required arguments that are absent or empty in `input`
    pub fn missing_args(&self, input: &ToolInput) -> Vec<String> {
        self.args
            .iter()
            .filter(|arg| arg.required && input.opt_arg(&arg.name).is_none())
            .map(|arg| arg.name.clone())
            .collect()
    }

    /// Fail with the list of missing required arguments, if any
    pub fn validate_args(&self, input: &ToolInput) -> KubiyaResult<()> {
        let missing = self.missing_args(input);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(KubiyaError::invalid_argument(format!(
                "Missing required arguments: {}",
                missing.join(", ")
            )))
        }
    }

    /// Fail with guidance when a required env var or secret is unset
    pub fn validate_env(&self, input: &ToolInput) -> KubiyaResult<()> {
        let missing: Vec<&str> = self
            .required_env()
            .filter(|name| input.env_var(name).is_none())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(KubiyaError::config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    /// JSON schema handed to the model
    pub fn definition(&self) -> ToolDefinition {
        let mut properties = serde_json::Map::new();
        for arg in &self.args {
            let mut prop = serde_json::json!({
                "type": "string",
                "description": arg.description,
            });
            if let Some(default) = &arg.default {
                prop["default"] = serde_json::Value::String(default.clone());
            }
            properties.insert(arg.name.clone(), prop);
        }

        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
            .collect();

        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

/// Model-facing view of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}
