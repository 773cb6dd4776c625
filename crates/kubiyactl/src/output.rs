//! Output formatting shared by kubiyactl commands

use anyhow::Result;
use kubiya_core::ToolType;
use serde::Serialize;

/// Structured output formats accepted by `-o`
pub enum Structured {
    Json,
    Yaml,
}

impl Structured {
    pub fn parse(output: &str) -> Option<Self> {
        match output {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Render a value as pretty JSON or YAML
pub fn render<T: Serialize>(value: &T, format: Structured) -> Result<String> {
    Ok(match format {
        Structured::Json => serde_json::to_string_pretty(value)?,
        Structured::Yaml => serde_yaml::to_string(value)?,
    })
}

pub fn tool_type_name(tool_type: ToolType) -> &'static str {
    match tool_type {
        ToolType::Docker => "docker",
        ToolType::Native => "native",
    }
}

/// Split `KEY=VALUE`; the value may itself contain `=`
pub fn parse_key_value(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => anyhow::bail!("Expected KEY=VALUE, got '{}'", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("command=get pods -l app=web").unwrap(),
            ("command".to_string(), "get pods -l app=web".to_string())
        );
        assert_eq!(parse_key_value("empty=").unwrap().1, "");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
