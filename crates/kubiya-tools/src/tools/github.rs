//! GitHub CLI Tools
//!
//! ## Available Tools
//!
//! - `github_cli` - Run any `gh` command (without the `gh` prefix)
//!
//! `gh` authenticates from the `GH_TOKEN` secret.

use kubiya_core::{Arg, Tool, ToolSpec, ToolType, DEFAULT_IMAGE};

use super::script::ScriptTool;
use crate::config::ToolsConfig;

pub const GITHUB_ICON_URL: &str = "https://github.githubassets.com/images/modules/logos_page/GitHub-Mark.png";

const GITHUB_CLI_SCRIPT: &str = r#"
if [ -z "${GH_TOKEN:-}" ]; then
    echo "GH_TOKEN environment variable is required"
    exit 1
fi

if [ -z "${command:-}" ]; then
    echo "Command argument is required"
    echo "Usage: Pass any 'gh' command as the 'command' argument"
    echo "Examples:"
    echo "  command='repo list'"
    echo "  command='issue create --title \"Bug\" --body \"Description\"'"
    echo "  command='pr list --state open'"
    exit 1
fi

if ! command -v gh >/dev/null 2>&1; then
    apk add --no-cache jq curl github-cli git >/dev/null 2>&1 || {
        echo "Failed to install required packages"
        exit 1
    }
fi

export GH_TOKEN

echo "Executing GitHub CLI command: gh $command"
echo "----------------------------------------"

eval "gh $command"
exit_code=$?

echo "----------------------------------------"
if [ $exit_code -eq 0 ]; then
    echo "Command executed successfully"
else
    echo "Command failed with exit code: $exit_code"
fi
exit $exit_code
"#;

/// Collection of all GitHub tools
pub struct GitHubTools;

impl GitHubTools {
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![Box::new(ScriptTool::new(github_cli_spec(config)))]
    }

    pub fn is_available() -> bool {
        which::which("gh").is_ok()
    }
}

pub fn github_cli_spec(config: &ToolsConfig) -> ToolSpec {
    ToolSpec::new(
        "github_cli",
        "Execute GitHub CLI commands. Pass any 'gh' command as the 'command' argument. The tool handles \
         authentication and returns the output. Examples: 'repo list', \
         'issue create --title \"Bug\" --body \"Description\"', 'pr list --state open'",
        DEFAULT_IMAGE,
    )
    .with_args(vec![Arg::required(
        "command",
        "The GitHub CLI command to execute (without 'gh' prefix). Examples: 'repo list', \
         'issue create --title \"Bug\"', 'pr list --state open'",
    )])
    .with_content(GITHUB_CLI_SCRIPT)
    .with_secrets(&["GH_TOKEN"])
    .with_icon(GITHUB_ICON_URL)
    .with_type(ToolType::Docker)
    .with_timeout(config.script_timeout_secs)
}
