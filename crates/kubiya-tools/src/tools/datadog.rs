//! Datadog CLI Tools
//!
//! ## Available Tools
//!
//! - `datadog_cli_command` - Run any `datadog` CLI command
//!
//! The prologue writes `~/.dogrc` from `DD_API_KEY`, `DD_APP_KEY` and
//! `DD_SITE` before the command runs.

use kubiya_core::{Arg, Tool, ToolSpec, ToolType};

use super::script::ScriptTool;
use crate::config::ToolsConfig;

pub const DATADOG_CLI_IMAGE: &str = "datadog/cli:latest";
pub const DATADOG_ICON_URL: &str = "https://cdn.worldvectorlogo.com/logos/datadog.svg";

const DOGRC_PROLOGUE: &str = r#"
if [ -z "${DD_API_KEY:-}" ]; then
    echo "Error: DD_API_KEY environment variable is not set"
    echo "Hint: find your API key in Datadog under Settings > API Keys"
    exit 1
fi
if [ -z "${DD_APP_KEY:-}" ]; then
    echo "Error: DD_APP_KEY environment variable is not set"
    echo "Hint: find your Application key in Datadog under Settings > Application Keys"
    exit 1
fi
if [ -z "${DD_SITE:-}" ]; then
    echo "Error: DD_SITE environment variable is not set"
    echo "Hint: e.g. datadoghq.com (US), datadoghq.eu (EU), us3.datadoghq.com (US3)"
    exit 1
fi

cat > "$HOME/.dogrc" <<EOF
[Connection]
apikey = ${DD_API_KEY}
appkey = ${DD_APP_KEY}
api_host = https://api.${DD_SITE}
EOF
"#;

const DATADOG_SCRIPT: &str = r#"
if [ -z "${command:-}" ]; then
    echo "Error: Command is required"
    exit 1
fi

echo "=== Executing Datadog CLI Command ==="
echo "Command: datadog $command"
echo ""

eval "datadog $command"
"#;

/// Collection of all Datadog tools
pub struct DatadogTools;

impl DatadogTools {
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![Box::new(ScriptTool::new(datadog_cli_command_spec(config)))]
    }

    pub fn is_available() -> bool {
        which::which("datadog").is_ok()
    }
}

pub fn datadog_cli_command_spec(config: &ToolsConfig) -> ToolSpec {
    ToolSpec::new("datadog_cli_command", "Execute any Datadog CLI command", DATADOG_CLI_IMAGE)
        .with_args(vec![Arg::required(
            "command",
            "The command to pass to the Datadog CLI (e.g., 'monitor list', 'dashboards list')",
        )])
        .with_content(format!("{}{}", DOGRC_PROLOGUE, DATADOG_SCRIPT))
        .with_secrets(&["DD_API_KEY", "DD_APP_KEY"])
        .with_env(&["DD_SITE"])
        .with_icon(DATADOG_ICON_URL)
        .with_type(ToolType::Docker)
        .with_timeout(config.script_timeout_secs)
}
