use kubiya_tools::ToolsConfig;

/// Print version information
pub fn execute(config: &ToolsConfig) {
    println!("kubiyactl {}", env!("CARGO_PKG_VERSION"));
    println!("kubiya-core {}", kubiya_core::VERSION);
    println!("workspace: {}", config.workspace_dir.display());
}
