use anyhow::Result;
use kubiya_core::{ToolExecutor, ToolInput};
use kubiya_tools::ToolRegistry;
use tracing::debug;

use crate::output::parse_key_value;

/// Run a tool; returns the exit code to leave the process with
pub async fn execute(
    registry: ToolRegistry,
    tool: &str,
    args: &[String],
    env: &[String],
    args_json: Option<&str>,
    output: &str,
) -> Result<i32> {
    if !matches!(output, "text" | "json") {
        anyhow::bail!("Unknown output format: {} (expected text, json)", output);
    }

    let mut input = match args_json {
        Some(raw) => {
            let value: serde_json::Value = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Invalid --args-json: {}", e))?;
            ToolInput::from_json(value)?
        }
        None => ToolInput::new(),
    };
    for raw in args {
        let (key, value) = parse_key_value(raw)?;
        input = input.with_arg(&key, value);
    }
    for raw in env {
        let (key, value) = parse_key_value(raw)?;
        input = input.with_env(&key, value);
    }

    let executor = registry.into_executor();
    if executor.get_tool(tool).is_none() {
        anyhow::bail!("Tool '{}' not found. Use 'kubiyactl get tools' to list.", tool);
    }

    debug!(tool, args = input.args.len(), "Running tool");
    let result = match executor.execute_tool(tool, input).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(e.exit_code());
        }
    };

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => println!("{}", result.output),
    }

    Ok(result.exit_code)
}
