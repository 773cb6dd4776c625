use anyhow::Result;
use kubiya_core::Tool;
use kubiya_tools::output::{ellipsize, render_table};
use kubiya_tools::{ToolGroup, ToolRegistry};
use serde_json::json;
use std::sync::Arc;

use crate::output::{render, tool_type_name, Structured};

const DESCRIPTION_WIDTH: usize = 60;

/// List resources (kubectl-style: get <resource-type>)
pub fn execute(registry: &ToolRegistry, resource_type: &str, group: Option<&str>, output: &str) -> Result<()> {
    match resource_type {
        "tools" | "tool" => get_tools(registry, group, output),
        "groups" | "group" => get_groups(registry, output),
        other => anyhow::bail!("Unknown resource type: {} (expected tools or groups)", other),
    }
}

fn get_tools(registry: &ToolRegistry, group: Option<&str>, output: &str) -> Result<()> {
    let tools: Vec<Arc<dyn Tool>> = match group {
        Some(name) => {
            let group = ToolGroup::parse(name);
            let tools = registry.list_by_group(&group);
            if tools.is_empty() {
                anyhow::bail!("No tools registered under group '{}'", name);
            }
            tools
        }
        None => registry
            .list_names()
            .iter()
            .filter_map(|name| registry.get(name))
            .collect(),
    };

    let group_name = |tool: &Arc<dyn Tool>| {
        registry
            .group_of(tool.name())
            .map(|g| g.to_string())
            .unwrap_or_default()
    };
    let available = |tool: &Arc<dyn Tool>| {
        registry
            .group_of(tool.name())
            .map_or(false, ToolGroup::is_available)
    };

    if let Some(format) = Structured::parse(output) {
        let items: Vec<_> = tools
            .iter()
            .map(|tool| {
                let spec = tool.spec();
                json!({
                    "name": spec.name,
                    "group": group_name(tool),
                    "type": tool_type_name(spec.tool_type),
                    "image": spec.image,
                    "available": available(tool),
                    "description": spec.description,
                    "parameters": tool.definition().parameters,
                })
            })
            .collect();
        println!("{}", render(&json!({"kind": "ToolList", "items": items}), format)?);
        return Ok(());
    }

    match output {
        "name" => {
            for tool in &tools {
                println!("tool/{}", tool.name());
            }
        }
        "wide" | "table" => {
            let rows = tools
                .iter()
                .map(|tool| {
                    let spec = tool.spec();
                    vec![
                        spec.name.clone(),
                        group_name(tool),
                        tool_type_name(spec.tool_type).to_string(),
                        spec.image.clone(),
                        yes_no(available(tool)).to_string(),
                        spec.args.len().to_string(),
                        ellipsize(&spec.description, DESCRIPTION_WIDTH),
                    ]
                })
                .collect();
            println!("{}", render_table(&["NAME", "GROUP", "TYPE", "IMAGE", "AVAILABLE", "ARGS", "DESCRIPTION"], rows));
        }
        other => anyhow::bail!("Unknown output format: {} (expected wide, json, yaml, name)", other),
    }

    Ok(())
}

fn get_groups(registry: &ToolRegistry, output: &str) -> Result<()> {
    let groups = registry.groups();

    if let Some(format) = Structured::parse(output) {
        let items: Vec<_> = groups
            .iter()
            .map(|(group, tools)| {
                json!({
                    "name": group.to_string(),
                    "available": group.is_available(),
                    "tools": tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", render(&json!({"kind": "ToolGroupList", "items": items}), format)?);
        return Ok(());
    }

    match output {
        "name" => {
            for group in groups.keys() {
                println!("group/{}", group);
            }
        }
        _ => {
            let rows = groups
                .iter()
                .map(|(group, tools)| {
                    vec![
                        group.to_string(),
                        yes_no(group.is_available()).to_string(),
                        tools.len().to_string(),
                        tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(","),
                    ]
                })
                .collect();
            println!("{}", render_table(&["GROUP", "AVAILABLE", "TOOLS", "NAMES"], rows));
        }
    }

    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
