//! Bicep Template Tools
//!
//! ## Available Tools
//!
//! - `bicep_template` - Build a Bicep template (URL, file path, or inline
//!   content) into an ARM template and print it
//!
//! Uses the Azure service principal from [`super::azure::AZURE_SECRETS`].

use kubiya_core::{Arg, Tool, ToolSpec, ToolType, DEFAULT_IMAGE};

use super::azure::{AZURE_LOGIN, AZURE_SECRETS};
use super::script::ScriptTool;
use crate::config::ToolsConfig;

pub const BICEP_ICON_URL: &str =
    "https://docs.microsoft.com/en-us/azure/azure-resource-manager/bicep/media/bicep-logo.png";

const BICEP_SCRIPT: &str = r#"
if [ -z "${template:-}" ]; then
    echo "Template argument is required"
    echo "Usage: Pass a Bicep template file path, URL, or template content as the 'template' argument"
    echo "Examples:"
    echo "  template='./main.bicep'"
    echo "  template='https://raw.githubusercontent.com/Azure/azure-quickstart-templates/master/quickstarts/microsoft.storage/storage-account-create/main.bicep'"
    echo "  template='resource storageAccount \"Microsoft.Storage/storageAccounts@2021-04-01\" = { ... }'"
    exit 1
fi

if echo "$template" | grep -Eq '^https?://'; then
    echo "Downloading Bicep template from URL..."
    template_file="/tmp/downloaded_template.bicep"
    if ! curl -sf -o "$template_file" "$template"; then
        echo "Failed to download template from URL: $template"
        exit 1
    fi
elif [ -f "$template" ]; then
    echo "Using Bicep template file: $template"
    template_file="$template"
else
    echo "Processing Bicep template content..."
    template_file="/tmp/template_content.bicep"
    printf '%s\n' "$template" > "$template_file"
fi

arm_template="/tmp/template.json"
echo "Building Bicep template: $template_file"
echo "----------------------------------------"
if ! bicep build "$template_file" --outfile "$arm_template"; then
    echo "Bicep template build failed"
    exit 1
fi

echo "Bicep template built successfully"
echo "Generated ARM template:"
jq '.' "$arm_template" 2>/dev/null || cat "$arm_template"
echo "----------------------------------------"
echo "To deploy this template:"
echo "  az deployment group create --resource-group <resource-group> --template-file $arm_template"
"#;

/// Collection of all Bicep tools
pub struct BicepTools;

impl BicepTools {
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![Box::new(ScriptTool::new(bicep_template_spec(config)))]
    }

    pub fn is_available() -> bool {
        which::which("bicep").is_ok()
    }
}

pub fn bicep_template_spec(config: &ToolsConfig) -> ToolSpec {
    ToolSpec::new(
        "bicep_template",
        "Process Bicep templates - validate, build, or deploy Azure infrastructure using Bicep. Pass a \
         Bicep template file path, URL, or template content as the 'template' argument.",
        DEFAULT_IMAGE,
    )
    .with_args(vec![Arg::required(
        "template",
        "Bicep template to process. Can be: 1) File path to .bicep file, 2) URL to a Bicep template, or \
         3) Bicep template content as a string",
    )])
    .with_content(format!("{}{}", AZURE_LOGIN, BICEP_SCRIPT))
    .with_secrets(AZURE_SECRETS)
    .with_icon(BICEP_ICON_URL)
    .with_type(ToolType::Docker)
    .with_timeout(config.script_timeout_secs)
}
