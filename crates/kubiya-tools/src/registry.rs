//! Tool Registry - Central registration and discovery for tools
//!
//! Tools are registered under a group (the plugin they ship in, e.g.
//! `argocd_cli`) and looked up by their unique name. Registering a second
//! tool with an existing name replaces the first.

use async_trait::async_trait;
use kubiya_core::{KubiyaError, KubiyaResult, Tool, ToolDefinition, ToolExecutor, ToolInput, ToolResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ToolsConfig;

/// Plugin group a tool is registered under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolGroup {
    ArgocdCli,
    AzureCli,
    BicepTemplate,
    Confluence,
    DatadogCli,
    GithubCli,
    HelmCli,
    ObserveCli,
    /// Custom user-defined tools
    Custom(String),
}

impl ToolGroup {
    /// All built-in groups, in display order
    pub const BUILTIN: [ToolGroup; 8] = [
        ToolGroup::ArgocdCli,
        ToolGroup::AzureCli,
        ToolGroup::BicepTemplate,
        ToolGroup::Confluence,
        ToolGroup::DatadogCli,
        ToolGroup::GithubCli,
        ToolGroup::HelmCli,
        ToolGroup::ObserveCli,
    ];

    pub fn parse(name: &str) -> Self {
        Self::BUILTIN
            .iter()
            .find(|g| g.to_string() == name)
            .cloned()
            .unwrap_or_else(|| ToolGroup::Custom(name.to_string()))
    }

    /// Whether the binaries the group's scripts call are on PATH.
    /// Native groups only need the network.
    pub fn is_available(&self) -> bool {
        use crate::tools::script::ScriptTool;

        match self {
            #[cfg(feature = "azure")]
            ToolGroup::AzureCli => ScriptTool::is_available() && crate::tools::azure::AzureTools::is_available(),
            #[cfg(feature = "bicep")]
            ToolGroup::BicepTemplate => {
                ScriptTool::is_available() && crate::tools::bicep::BicepTools::is_available()
            }
            #[cfg(feature = "datadog")]
            ToolGroup::DatadogCli => {
                ScriptTool::is_available() && crate::tools::datadog::DatadogTools::is_available()
            }
            #[cfg(feature = "github")]
            ToolGroup::GithubCli => ScriptTool::is_available() && crate::tools::github::GitHubTools::is_available(),
            #[cfg(feature = "helm")]
            ToolGroup::HelmCli => ScriptTool::is_available() && crate::tools::helm::HelmTools::is_available(),
            ToolGroup::Custom(_) => ScriptTool::is_available(),
            _ => true,
        }
    }
}

impl std::fmt::Display for ToolGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolGroup::ArgocdCli => write!(f, "argocd_cli"),
            ToolGroup::AzureCli => write!(f, "azure_cli"),
            ToolGroup::BicepTemplate => write!(f, "bicep_template"),
            ToolGroup::Confluence => write!(f, "confluence"),
            ToolGroup::DatadogCli => write!(f, "datadog_cli"),
            ToolGroup::GithubCli => write!(f, "github_cli"),
            ToolGroup::HelmCli => write!(f, "helm_cli"),
            ToolGroup::ObserveCli => write!(f, "observe_cli"),
            ToolGroup::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Tool registry for managing available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    groups: BTreeMap<String, ToolGroup>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every compiled-in plugin
    #[cfg_attr(
        not(any(
            feature = "argocd",
            feature = "azure",
            feature = "bicep",
            feature = "confluence",
            feature = "datadog",
            feature = "github",
            feature = "helm",
            feature = "observe"
        )),
        allow(unused_variables)
    )]
    pub fn with_all_defaults(config: &ToolsConfig) -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "argocd")]
        registry.register_group(ToolGroup::ArgocdCli, crate::tools::argocd::ArgoCDTools::all(config));

        #[cfg(feature = "azure")]
        registry.register_group(ToolGroup::AzureCli, crate::tools::azure::AzureTools::all(config));

        #[cfg(feature = "bicep")]
        registry.register_group(ToolGroup::BicepTemplate, crate::tools::bicep::BicepTools::all(config));

        #[cfg(feature = "confluence")]
        registry.register_group(
            ToolGroup::Confluence,
            crate::tools::confluence::ConfluenceTools::all(config),
        );

        #[cfg(feature = "datadog")]
        registry.register_group(ToolGroup::DatadogCli, crate::tools::datadog::DatadogTools::all(config));

        #[cfg(feature = "github")]
        registry.register_group(ToolGroup::GithubCli, crate::tools::github::GitHubTools::all(config));

        #[cfg(feature = "helm")]
        registry.register_group(ToolGroup::HelmCli, crate::tools::helm::HelmTools::all(config));

        #[cfg(feature = "observe")]
        registry.register_group(ToolGroup::ObserveCli, crate::tools::observe::ObserveTools::all(config));

        registry
    }

    /// Register a single tool under `group`
    pub fn register<T: Tool + 'static>(&mut self, group: ToolGroup, tool: T) -> &mut Self {
        self.insert(group, Arc::new(tool));
        self
    }

    /// Register a plugin's tools under one group
    pub fn register_group(&mut self, group: ToolGroup, tools: Vec<Box<dyn Tool>>) -> &mut Self {
        for tool in tools {
            self.insert(group.clone(), Arc::from(tool));
        }
        self
    }

    fn insert(&mut self, group: ToolGroup, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if let Some(previous) = self.groups.get(&name) {
            warn!(tool = %name, previous_group = %previous, group = %group, "Replacing registered tool");
        } else {
            info!(tool = %name, group = %group, "Registering tool");
        }
        self.groups.insert(name.clone(), group);
        self.tools.insert(name, tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tool names, sorted
    pub fn list_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Tool definitions, sorted by name
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Group a tool was registered under
    pub fn group_of(&self, name: &str) -> Option<&ToolGroup> {
        self.groups.get(name)
    }

    /// Tools by group, both sorted
    pub fn groups(&self) -> BTreeMap<ToolGroup, Vec<Arc<dyn Tool>>> {
        let mut out: BTreeMap<ToolGroup, Vec<Arc<dyn Tool>>> = BTreeMap::new();
        for (name, tool) in &self.tools {
            if let Some(group) = self.groups.get(name) {
                out.entry(group.clone()).or_default().push(tool.clone());
            }
        }
        out
    }

    /// Tools in one group
    pub fn list_by_group(&self, group: &ToolGroup) -> Vec<Arc<dyn Tool>> {
        self.tools
            .iter()
            .filter(|(name, _)| self.groups.get(*name) == Some(group))
            .map(|(_, tool)| tool.clone())
            .collect()
    }

    /// Get tool count
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Convert registry into a tool executor
    pub fn into_executor(self) -> BuiltinToolExecutor {
        BuiltinToolExecutor::new(self)
    }

    /// Create executor reference without consuming registry
    pub fn as_executor(&self) -> BuiltinToolExecutor {
        BuiltinToolExecutor {
            tools: self.tools.clone(),
        }
    }
}

/// Built-in tool executor that wraps the registry
pub struct BuiltinToolExecutor {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl BuiltinToolExecutor {
    /// Create from registry
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            tools: registry.tools,
        }
    }
}

#[async_trait]
impl ToolExecutor for BuiltinToolExecutor {
    async fn execute_tool(&self, name: &str, input: ToolInput) -> KubiyaResult<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| KubiyaError::tool(format!("Tool not found: {}", name)))?;

        debug!(tool = %name, "Executing tool");
        let start = std::time::Instant::now();

        match tool.execute(input).await {
            Ok(result) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(tool = %name, elapsed_ms = %elapsed, success = %result.success, "Tool execution complete");
                Ok(result.with_execution_time(elapsed))
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                Err(e)
            }
        }
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubiya_core::ToolSpec;

    struct MockTool {
        spec: ToolSpec,
        reply: &'static str,
    }

    impl MockTool {
        fn new(name: &str) -> Self {
            Self::replying(name, "mock")
        }

        fn replying(name: &str, reply: &'static str) -> Self {
            Self {
                spec: ToolSpec::new(name, &format!("Mock tool: {}", name), "alpine:latest"),
                reply,
            }
        }
    }

    #[async_trait]
    impl Tool for MockTool {
        async fn execute(&self, _input: ToolInput) -> KubiyaResult<ToolResult> {
            Ok(ToolResult::text(self.reply))
        }

        fn spec(&self) -> &ToolSpec {
            &self.spec
        }
    }

    #[test]
    fn test_registry_register() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolGroup::Custom("test".into()), MockTool::new("test_tool"));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("test_tool").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.group_of("test_tool"), Some(&ToolGroup::Custom("test".into())));
    }

    #[test]
    fn test_registry_list_names_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolGroup::GithubCli, MockTool::new("tool2"));
        registry.register(ToolGroup::GithubCli, MockTool::new("tool1"));

        assert_eq!(registry.list_names(), vec!["tool1", "tool2"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolGroup::HelmCli, MockTool::replying("dup", "first"));
        registry.register(ToolGroup::DatadogCli, MockTool::replying("dup", "second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.group_of("dup"), Some(&ToolGroup::DatadogCli));
        let result = registry
            .as_executor()
            .execute_tool("dup", ToolInput::new())
            .await
            .unwrap();
        assert_eq!(result.output, "second");
    }

    #[test]
    fn test_group_names_round_trip() {
        for group in ToolGroup::BUILTIN {
            assert_eq!(ToolGroup::parse(&group.to_string()), group);
        }
        assert_eq!(ToolGroup::parse("mine"), ToolGroup::Custom("mine".into()));
    }

    #[cfg(feature = "all")]
    #[test]
    fn test_with_all_defaults() {
        let registry = ToolRegistry::with_all_defaults(&ToolsConfig::default());
        let groups = registry.groups();

        assert_eq!(groups.len(), 8);
        assert_eq!(groups[&ToolGroup::ArgocdCli].len(), 7);
        assert_eq!(groups[&ToolGroup::AzureCli].len(), 2);
        assert_eq!(registry.len(), 15);
        assert!(registry.get("observe_api_command").is_some());
        assert!(registry.get("helm_cli_command").is_some());
    }

    #[tokio::test]
    async fn test_executor_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolGroup::Custom("test".into()), MockTool::new("test_tool"));

        let executor = registry.into_executor();
        let result = executor.execute_tool("test_tool", ToolInput::new()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "mock");
    }

    #[tokio::test]
    async fn test_executor_tool_not_found() {
        let executor = ToolRegistry::new().into_executor();
        let result = executor.execute_tool("nonexistent", ToolInput::new()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_native_groups_always_available() {
        assert!(ToolGroup::ArgocdCli.is_available());
        assert!(ToolGroup::ObserveCli.is_available());
        assert!(ToolGroup::Confluence.is_available());
    }

    #[test]
    #[cfg(feature = "helm")]
    fn test_script_group_availability_follows_path() {
        assert_eq!(
            ToolGroup::HelmCli.is_available(),
            which::which("sh").is_ok() && which::which("helm").is_ok()
        );
        assert_eq!(
            ToolGroup::Custom("team_scripts".into()).is_available(),
            which::which("sh").is_ok()
        );
    }
}
