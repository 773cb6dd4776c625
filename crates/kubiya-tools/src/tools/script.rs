//! Script-payload tools
//!
//! A script tool is a [`ToolSpec`] whose `content` is a shell script. The
//! agent platform runs it inside `image`; locally it runs under `sh -c` with
//! the same contract: every argument is exported as an environment variable
//! of the same name and the script's exit status is the tool's exit code.

use async_trait::async_trait;
use kubiya_core::{KubiyaError, KubiyaResult, Tool, ToolInput, ToolResult, ToolSpec};
use std::collections::BTreeMap;
use tracing::debug;

use super::common::execute_command;

/// Tool backed by a shell script payload
pub struct ScriptTool {
    spec: ToolSpec,
}

impl ScriptTool {
    pub fn new(spec: ToolSpec) -> Self {
        Self { spec }
    }

    /// Whether a local `sh` is available to run payloads
    pub fn is_available() -> bool {
        which::which("sh").is_ok()
    }

    /// Environment handed to the script: argument defaults, arguments, then
    /// the caller's overlay
    fn script_env(&self, input: &ToolInput) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        for arg in &self.spec.args {
            if let Some(default) = &arg.default {
                env.insert(arg.name.clone(), default.clone());
            }
        }
        env.extend(input.args.iter().map(|(k, v)| (k.clone(), v.clone())));
        env.extend(
            input
                .env_overlay()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        env
    }
}

#[async_trait]
impl Tool for ScriptTool {
    async fn execute(&self, input: ToolInput) -> KubiyaResult<ToolResult> {
        self.spec.validate_args(&input)?;
        self.spec.validate_env(&input)?;

        let script = self.spec.content.as_deref().ok_or_else(|| {
            KubiyaError::tool(format!("Tool {} has no script content", self.spec.name))
        })?;

        debug!(tool = %self.spec.name, image = %self.spec.image, "Running script payload");

        let env = self.script_env(&input);
        let output = match execute_command(
            "sh",
            &["-c", script],
            None,
            &env,
            input.inherits_process_env(),
            self.spec.timeout_secs,
        )
        .await
        {
            Ok(output) => output,
            Err(e) => return Ok(ToolResult::from_error(&e)),
        };

        let text = output.combined();
        let data = output.to_json();
        if output.success {
            Ok(ToolResult::text(text).with_data(data))
        } else {
            Ok(ToolResult::failure(text, output.exit_code).with_data(data))
        }
    }

    fn spec(&self) -> &ToolSpec {
        &self.spec
    }
}
