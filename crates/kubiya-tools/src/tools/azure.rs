//! Azure CLI Tools
//!
//! Script tools that run `az` inside the Azure CLI image after a
//! service-principal login.
//!
//! ## Available Tools
//!
//! - `azure_cli` - Run any `az` command (without the `az` prefix)
//! - `azure_subscriptions_list` - List subscriptions visible to the principal
//!
//! ## Prerequisites
//!
//! - Secrets `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`, `AZURE_TENANT_ID`
//! - Azure CLI on `PATH` when run locally

use kubiya_core::{Arg, Tool, ToolSpec, ToolType};

use super::script::ScriptTool;
use crate::config::ToolsConfig;

pub const AZURE_CLI_IMAGE: &str = "mcr.microsoft.com/azure-cli:latest";
pub const AZURE_ICON_URL: &str = "https://docs.microsoft.com/en-us/media/logos/logo_azure.svg";

/// Service-principal credentials shared by every Azure-backed tool
pub const AZURE_SECRETS: &[&str] = &["AZURE_CLIENT_ID", "AZURE_CLIENT_SECRET", "AZURE_TENANT_ID"];

/// Credential check and non-interactive login
pub const AZURE_LOGIN: &str = r#"
for var in AZURE_CLIENT_ID AZURE_CLIENT_SECRET AZURE_TENANT_ID; do
    eval "value=\${$var:-}"
    if [ -z "$value" ]; then
        echo "$var environment variable is required"
        exit 1
    fi
done

echo "Authenticating with Azure..."
az login --service-principal \
    --username "$AZURE_CLIENT_ID" \
    --password "$AZURE_CLIENT_SECRET" \
    --tenant "$AZURE_TENANT_ID" >/dev/null 2>&1 || {
    echo "Azure authentication failed"
    exit 1
}
"#;

const AZURE_CLI_SCRIPT: &str = r#"
if [ -z "${command:-}" ]; then
    echo "Command argument is required"
    echo "Usage: Pass any 'az' command as the 'command' argument"
    echo "Examples:"
    echo "  command='group list --subscription mySubscription'"
    echo "  command='vm list --resource-group myRG --subscription mySubscription'"
    echo ""
    echo "Use azure_subscriptions_list first to see available subscriptions"
    exit 1
fi

echo "Executing Azure CLI command: az $command"
echo "----------------------------------------"

eval "az $command"
exit_code=$?

echo "----------------------------------------"
if [ $exit_code -eq 0 ]; then
    echo "Command executed successfully"
else
    echo "Command failed with exit code: $exit_code"
fi
exit $exit_code
"#;

const AZURE_SUBSCRIPTIONS_SCRIPT: &str = r#"
echo "Listing available Azure subscriptions:"
echo "----------------------------------------"
az account list --output table
exit_code=$?
echo "----------------------------------------"
echo "To use a specific subscription in azure_cli commands, add: --subscription 'subscription-id-or-name'"
exit $exit_code
"#;

/// Collection of all Azure tools
pub struct AzureTools;

impl AzureTools {
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![
            Box::new(ScriptTool::new(azure_cli_spec(config))),
            Box::new(ScriptTool::new(azure_subscriptions_list_spec(config))),
        ]
    }

    /// Check if Azure CLI is available
    pub fn is_available() -> bool {
        which::which("az").is_ok()
    }
}

fn azure_spec(config: &ToolsConfig, name: &str, description: &str, args: Vec<Arg>, script: &str) -> ToolSpec {
    ToolSpec::new(name, description, AZURE_CLI_IMAGE)
        .with_args(args)
        .with_content(format!("{}{}", AZURE_LOGIN, script))
        .with_secrets(AZURE_SECRETS)
        .with_icon(AZURE_ICON_URL)
        .with_type(ToolType::Docker)
        .with_timeout(config.script_timeout_secs)
}

pub fn azure_cli_spec(config: &ToolsConfig) -> ToolSpec {
    azure_spec(
        config,
        "azure_cli",
        "Execute Azure CLI commands. Pass any 'az' command as the 'command' argument. The tool handles \
         authentication and returns the output. Use --subscription in your commands to choose a \
         subscription. Examples: 'group list --subscription mySubscription', \
         'vm create --resource-group myRG --name myVM --image UbuntuLTS --subscription mySubscription'",
        vec![Arg::required(
            "command",
            "The Azure CLI command to execute (without 'az' prefix). Include --subscription to choose \
             a subscription. Examples: 'group list --subscription mySubscription', \
             'monitor app-insights query --app myApp --analytics-query \"requests | limit 10\"'",
        )],
        AZURE_CLI_SCRIPT,
    )
}

pub fn azure_subscriptions_list_spec(config: &ToolsConfig) -> ToolSpec {
    azure_spec(
        config,
        "azure_subscriptions_list",
        "List all Azure subscriptions available to the authenticated user. Use this to get subscription \
         IDs that can be passed to other Azure CLI commands using --subscription.",
        Vec::new(),
        AZURE_SUBSCRIPTIONS_SCRIPT,
    )
}
