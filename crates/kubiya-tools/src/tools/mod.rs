//! Tool implementations
//!
//! Each vendor plugin lives in its own module behind a feature flag and
//! exposes a collection type whose `all(&ToolsConfig)` returns its tools.
//!
//! ## Native tools
//!
//! Implemented in-process against vendor REST APIs:
//! - `argocd` - applications, clusters, repositories, sync, history, workspace
//! - `observe` - dataset, monitor, reference table, and query operations
//! - `confluence` - CQL search
//!
//! ## Script tools
//!
//! Carry a shell payload for an external container runner and can also be
//! executed locally through [`script::ScriptTool`]:
//! - `azure` - `az` commands and subscription listing
//! - `bicep` - Bicep to ARM template builds
//! - `datadog` - `datadog` CLI commands
//! - `github` - `gh` commands
//! - `helm` - `helm` commands inside the cluster

pub mod script;

#[cfg(feature = "argocd")]
pub mod argocd;

#[cfg(feature = "observe")]
pub mod observe;

#[cfg(feature = "confluence")]
pub mod confluence;

#[cfg(feature = "azure")]
pub mod azure;

#[cfg(feature = "bicep")]
pub mod bicep;

#[cfg(feature = "datadog")]
pub mod datadog;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "helm")]
pub mod helm;

/// Common utilities for tool implementations
pub mod common {
    use kubiya_core::{KubiyaError, KubiyaResult};
    use std::collections::BTreeMap;
    use std::time::Duration;

    /// Variables kept when a child runs without the parent environment
    const BASE_ENV: &[&str] = &["PATH", "HOME", "TMPDIR", "LANG"];

    /// Execute a command and capture its output.
    ///
    /// `env` is layered over the parent environment, or over a minimal base
    /// (`PATH`, `HOME`, ...) when `inherit_env` is false. Exceeding
    /// `timeout_secs` kills the child and returns a timeout error.
    pub async fn execute_command(
        program: &str,
        args: &[&str],
        working_dir: Option<&str>,
        env: &BTreeMap<String, String>,
        inherit_env: bool,
        timeout_secs: u64,
    ) -> KubiyaResult<CommandOutput> {
        use tokio::process::Command;

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        if !inherit_env {
            cmd.env_clear();
            for name in BASE_ENV {
                if let Ok(value) = std::env::var(name) {
                    cmd.env(name, value);
                }
            }
        }
        cmd.envs(env);

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| KubiyaError::tool(format!("Failed to spawn {}: {}", program, e)))?;

        let output = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| KubiyaError::timeout(format!("Command timed out after {}s", timeout_secs)))?
        .map_err(|e| KubiyaError::tool(format!("Command failed: {}", e)))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }

    /// Command execution output
    #[derive(Debug, Clone, serde::Serialize)]
    pub struct CommandOutput {
        pub exit_code: i32,
        pub stdout: String,
        pub stderr: String,
        pub success: bool,
    }

    impl CommandOutput {
        pub fn to_json(&self) -> serde_json::Value {
            serde_json::to_value(self).unwrap_or_default()
        }

        /// stdout followed by stderr, trimmed
        pub fn combined(&self) -> String {
            let stdout = self.stdout.trim_end();
            let stderr = self.stderr.trim_end();
            match (stdout.is_empty(), stderr.is_empty()) {
                (_, true) => stdout.to_string(),
                (true, false) => stderr.to_string(),
                (false, false) => format!("{}\n{}", stdout, stderr),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_execute_command_captures_output() {
            let env = BTreeMap::from([("GREETING".to_string(), "hi".to_string())]);
            let output = execute_command("sh", &["-c", "echo $GREETING; echo oops >&2"], None, &env, true, 10)
                .await
                .unwrap();
            assert!(output.success);
            assert_eq!(output.stdout.trim(), "hi");
            assert_eq!(output.combined(), "hi\noops");
        }

        #[tokio::test]
        async fn test_execute_command_isolated_env() {
            std::env::set_var("KUBIYA_TEST_LEAK", "leaked");
            let output = execute_command(
                "sh",
                &["-c", "echo \"[$KUBIYA_TEST_LEAK]\""],
                None,
                &BTreeMap::new(),
                false,
                10,
            )
            .await
            .unwrap();
            assert_eq!(output.stdout.trim(), "[]");
        }

        #[tokio::test]
        async fn test_execute_command_timeout() {
            let err = execute_command("sh", &["-c", "sleep 5"], None, &BTreeMap::new(), true, 1)
                .await
                .unwrap_err();
            assert!(matches!(err, KubiyaError::Timeout(_)));
        }

        #[tokio::test]
        async fn test_spawn_failure() {
            let err = execute_command("definitely-not-a-binary-xyz", &[], None, &BTreeMap::new(), true, 5)
                .await
                .unwrap_err();
            assert!(matches!(err, KubiyaError::Tool(_)));
        }
    }
}
