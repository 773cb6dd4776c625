//! Error types shared by every Kubiya tool crate

use thiserror::Error;

/// Result alias used across the workspace
pub type KubiyaResult<T> = Result<T, KubiyaError>;

/// Unified error for tool definition, execution, and caching.
///
/// Variants follow the failure taxonomy of the tool scripts: configuration
/// problems, transport failures, unparseable responses, and timeouts. Every
/// variant maps to a process exit status through [`KubiyaError::exit_code`].
#[derive(Error, Debug)]
pub enum KubiyaError {
    /// Required environment variable or setting is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool argument is missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Vendor HTTP/CLI call could not complete
    #[error("Transport error: {0}")]
    Transport(String),

    /// Vendor returned a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Vendor response could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A bounded wait ran out of attempts or time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// An external command exited with a non-zero status
    #[error("Command exited with status {code}: {message}")]
    Command { code: i32, message: String },

    /// Cache directory could not be read or written
    #[error("Cache error: {0}")]
    Cache(String),

    /// Tool lookup or execution failure
    #[error("Tool error: {0}")]
    Tool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl KubiyaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn command(code: i32, message: impl Into<String>) -> Self {
        Self::Command {
            code,
            message: message.into(),
        }
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// External command failures keep the command's own status; everything
    /// else is a generic failure (`1`).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Command { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// True for errors caused by missing credentials or settings
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
