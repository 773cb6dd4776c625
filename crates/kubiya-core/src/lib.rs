// Kubiya Core - Foundation types and traits for Kubiya tool plugins
//
// Tools wrap vendor CLIs and REST APIs behind a declared name, description,
// string arguments and container image, so an agent can call them as actions.

pub mod error;
pub mod tool;

pub use error::{KubiyaError, KubiyaResult};
pub use tool::{
    Arg, FileSpec, Tool, ToolDefinition, ToolExecutor, ToolInput, ToolResult, ToolSpec, ToolType,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default container image for tools that only need `sh`, `curl` and `jq`
pub const DEFAULT_IMAGE: &str = "alpine:latest";
