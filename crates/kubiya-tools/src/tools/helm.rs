//! Helm CLI Tools
//!
//! ## Available Tools
//!
//! - `helm_cli_command` - Run any `helm` command against the cluster the
//!   agent runs in
//!
//! The service-account token and CA are mounted into the container and a
//! prologue turns them into an `in-cluster` kube context.

use kubiya_core::{Arg, FileSpec, Tool, ToolSpec, ToolType};

use super::script::ScriptTool;
use crate::config::ToolsConfig;

pub const HELM_IMAGE: &str = "alpine/helm:latest";
pub const HELM_ICON_URL: &str = "https://helm.sh/img/helm.svg";

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const TOKEN_LOCATION: &str = "/tmp/kubernetes_context_token";
const CERT_LOCATION: &str = "/tmp/kubernetes_context_cert";

const KUBE_CONTEXT_PROLOGUE: &str = r#"
set -eu
TOKEN_LOCATION="/tmp/kubernetes_context_token"
CERT_LOCATION="/tmp/kubernetes_context_cert"
if [ -f "$TOKEN_LOCATION" ] && [ -f "$CERT_LOCATION" ]; then
    KUBE_TOKEN=$(cat "$TOKEN_LOCATION")
    kubectl config set-cluster in-cluster --server=https://kubernetes.default.svc \
        --certificate-authority="$CERT_LOCATION" >/dev/null 2>&1
    kubectl config set-credentials in-cluster --token="$KUBE_TOKEN" >/dev/null 2>&1
    kubectl config set-context in-cluster --cluster=in-cluster --user=in-cluster >/dev/null 2>&1
    kubectl config use-context in-cluster >/dev/null 2>&1
else
    echo "Error: Kubernetes context token or cert file not found at $TOKEN_LOCATION or $CERT_LOCATION respectively."
    exit 1
fi
"#;

const HELM_SCRIPT: &str = r#"
if [ -z "${command:-}" ]; then
    echo "Error: Command is required"
    exit 1
fi

echo "=== Executing Helm CLI Command ==="
echo "Command: helm $command"
echo ""

eval "helm $command"
"#;

/// Collection of all Helm tools
pub struct HelmTools;

impl HelmTools {
    pub fn all(config: &ToolsConfig) -> Vec<Box<dyn Tool>> {
        vec![Box::new(ScriptTool::new(helm_cli_command_spec(config)))]
    }

    pub fn is_available() -> bool {
        which::which("helm").is_ok()
    }
}

pub fn helm_cli_command_spec(config: &ToolsConfig) -> ToolSpec {
    ToolSpec::new("helm_cli_command", "Execute any Helm CLI command", HELM_IMAGE)
        .with_args(vec![Arg::required(
            "command",
            "The command to pass to the Helm CLI (e.g., 'list', 'install my-release ./chart', \
             'upgrade my-release ./chart')",
        )])
        .with_content(format!("{}{}", KUBE_CONTEXT_PROLOGUE, HELM_SCRIPT))
        .with_files(vec![
            FileSpec::new(&format!("{}/token", SERVICE_ACCOUNT_DIR), TOKEN_LOCATION),
            FileSpec::new(&format!("{}/ca.crt", SERVICE_ACCOUNT_DIR), CERT_LOCATION),
        ])
        .with_icon(HELM_ICON_URL)
        .with_type(ToolType::Docker)
        .with_timeout(config.script_timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubiya_core::ToolInput;

    #[test]
    fn test_helm_spec_mounts_service_account() {
        let spec = helm_cli_command_spec(&ToolsConfig::default());
        assert_eq!(spec.image, HELM_IMAGE);
        assert!(spec.secrets.is_empty());
        assert_eq!(spec.with_files.len(), 2);
        assert_eq!(
            spec.with_files[0].source,
            "/var/run/secrets/kubernetes.io/serviceaccount/token"
        );
        assert_eq!(spec.with_files[1].destination, "/tmp/kubernetes_context_cert");
    }

    #[tokio::test]
    async fn test_missing_context_files_fail() {
        if std::path::Path::new(TOKEN_LOCATION).exists() {
            return;
        }
        let result = ScriptTool::new(helm_cli_command_spec(&ToolsConfig::default()))
            .execute(ToolInput::new().with_arg("command", "list"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("Kubernetes context token or cert file not found"));
    }
}
