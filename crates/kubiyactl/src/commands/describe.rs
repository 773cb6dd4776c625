//! Describe resources in detail (kubectl describe compatible)

use anyhow::Result;
use kubiya_core::ToolSpec;
use kubiya_tools::ToolRegistry;
use serde_json::json;

use crate::output::{render, tool_type_name, Structured};

/// Describe a resource in detail
pub fn execute(registry: &ToolRegistry, resource_type: &str, name: &str, output: &str) -> Result<()> {
    if !matches!(resource_type, "tool" | "tools") {
        anyhow::bail!("Unknown resource type: {} (expected tool)", resource_type);
    }

    let tool = registry.get(name).ok_or_else(|| {
        anyhow::anyhow!("Tool '{}' not found. Use 'kubiyactl get tools' to list.", name)
    })?;
    let group = registry
        .group_of(name)
        .map(|g| g.to_string())
        .unwrap_or_default();

    if let Some(format) = Structured::parse(output) {
        let mut value = serde_json::to_value(tool.spec())?;
        value["group"] = json!(group);
        println!("{}", render(&value, format)?);
        return Ok(());
    }

    print!("{}", describe_text(tool.spec(), &group));
    Ok(())
}

fn describe_text(spec: &ToolSpec, group: &str) -> String {
    let mut out = String::new();
    let mut line = |s: String| {
        out.push_str(&s);
        out.push('\n');
    };

    line(format!("Name:         {}", spec.name));
    line(format!("Group:        {}", group));
    line(format!("Type:         {}", tool_type_name(spec.tool_type)));
    line(format!("Image:        {}", spec.image));
    line(format!("Timeout:      {}s", spec.timeout_secs));
    if let Some(icon) = &spec.icon_url {
        line(format!("Icon:         {}", icon));
    }
    line(format!("Description:  {}", spec.description));

    line(String::new());
    line("Arguments:".to_string());
    if spec.args.is_empty() {
        line("  <none>".to_string());
    }
    for arg in &spec.args {
        let mut flags = vec![if arg.required { "required" } else { "optional" }.to_string()];
        if let Some(default) = &arg.default {
            flags.push(format!("default: {}", default));
        }
        line(format!("  {} ({})", arg.name, flags.join(", ")));
        line(format!("      {}", arg.description));
    }

    if !spec.secrets.is_empty() {
        line(String::new());
        line(format!("Secrets:      {}", spec.secrets.join(", ")));
    }
    if !spec.env.is_empty() {
        line(format!("Environment:  {}", spec.env.join(", ")));
    }
    if !spec.with_files.is_empty() {
        line(String::new());
        line("Files:".to_string());
        for file in &spec.with_files {
            line(format!("  {} -> {}", file.source, file.destination));
        }
    }
    if let Some(content) = &spec.content {
        line(String::new());
        line("Content:".to_string());
        for script_line in content.trim_matches('\n').lines() {
            line(format!("  {}", script_line));
        }
    }

    out
}
