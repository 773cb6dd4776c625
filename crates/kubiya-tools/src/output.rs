//! Output shaping shared by the tools: format selection, tables, summaries,
//! and truncation of oversized responses.

use comfy_table::{presets, ContentArrangement, Table};
use kubiya_core::ToolInput;
use serde_json::Value;
use std::collections::BTreeMap;

/// Default limits for raw API output
pub const MAX_OUTPUT_LINES: usize = 100;
pub const MAX_OUTPUT_CHARS: usize = 10_000;

/// `output_format` argument values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Compact,
    Summary,
    Basic,
    Detailed,
    Resources,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "compact" => Some(OutputFormat::Compact),
            "summary" => Some(OutputFormat::Summary),
            "basic" => Some(OutputFormat::Basic),
            "detailed" => Some(OutputFormat::Detailed),
            "resources" => Some(OutputFormat::Resources),
            _ => None,
        }
    }

    /// Read `output_format`; absent means `default`, unrecognised means JSON
    pub fn from_input(input: &ToolInput, default: OutputFormat) -> Self {
        match input.opt_arg("output_format") {
            Some(raw) => Self::parse(&raw).unwrap_or(OutputFormat::Json),
            None => default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Compact => "compact",
            OutputFormat::Summary => "summary",
            OutputFormat::Basic => "basic",
            OutputFormat::Detailed => "detailed",
            OutputFormat::Resources => "resources",
        }
    }
}

/// Borderless, left-aligned table
pub fn render_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(headers.to_vec());
    for row in rows {
        table.add_row(row);
    }
    table
        .to_string()
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `"<title>:\n  <value>: <count>"` lines, values sorted
pub fn breakdown<I>(title: &str, values: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut out = format!("{}:", title);
    for (value, count) in counts {
        out.push_str(&format!("\n  {}: {}", value, count));
    }
    out
}

/// String at a JSON pointer, if it is a non-empty string
pub fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// First non-empty string among `pointers`, else `default`
pub fn str_or(value: &Value, pointers: &[&str], default: &str) -> String {
    pointers
        .iter()
        .find_map(|p| str_at(value, p))
        .unwrap_or(default)
        .to_string()
}

/// Pretty JSON, falling back to compact on the (unreachable) error path
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Pretty-print JSON text; non-JSON text is returned unchanged
pub fn pretty_or_raw(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => pretty_json(&value),
        Err(_) => text.to_string(),
    }
}

/// Text cut to size, with a notice per limit that was hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    pub notices: Vec<String>,
}

impl Truncated {
    pub fn was_truncated(&self) -> bool {
        !self.notices.is_empty()
    }
}

/// Keep at most `max_lines` lines, then at most `max_chars` characters
pub fn truncate(text: &str, max_lines: usize, max_chars: usize) -> Truncated {
    let mut notices = Vec::new();
    let mut out = text.to_string();

    if out.lines().count() > max_lines {
        notices.push(format!(
            "Output truncated to {} lines. Refine your query or use filters for more data.",
            max_lines
        ));
        out = out.lines().take(max_lines).collect::<Vec<_>>().join("\n");
    }

    if out.chars().count() > max_chars {
        notices.push(format!(
            "Output truncated to {} characters. Refine your query or use filters for more data.",
            max_chars
        ));
        out = out.chars().take(max_chars).collect();
    }

    Truncated { text: out, notices }
}

/// Cut a single line to `max` characters, appending `...` when shortened
pub fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_input() {
        let input = ToolInput::new();
        assert_eq!(OutputFormat::from_input(&input, OutputFormat::Table), OutputFormat::Table);

        let input = ToolInput::new().with_arg("output_format", "Summary");
        assert_eq!(OutputFormat::from_input(&input, OutputFormat::Table), OutputFormat::Summary);

        let input = ToolInput::new().with_arg("output_format", "yaml");
        assert_eq!(OutputFormat::from_input(&input, OutputFormat::Table), OutputFormat::Json);
    }

    #[test]
    fn test_render_table() {
        let table = render_table(
            &["NAME", "HEALTH"],
            vec![
                vec!["guestbook".into(), "Healthy".into()],
                vec!["api".into(), "Degraded".into()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("NAME") && lines[0].contains("HEALTH"));
        assert!(lines[1].contains("guestbook"));
        assert!(!table.contains('|'));
    }

    #[test]
    fn test_breakdown_sorted_counts() {
        let text = breakdown(
            "Health status breakdown",
            vec!["Healthy".to_string(), "Degraded".into(), "Healthy".into()],
        );
        assert_eq!(text, "Health status breakdown:\n  Degraded: 1\n  Healthy: 2");
    }

    #[test]
    fn test_str_or() {
        let app = json!({"spec": {"destination": {"name": "in-cluster"}}});
        assert_eq!(
            str_or(&app, &["/spec/destination/server", "/spec/destination/name"], "unknown"),
            "in-cluster"
        );
        assert_eq!(str_or(&app, &["/status/health/status"], "unknown"), "unknown");
    }

    #[test]
    fn test_truncate_lines_then_chars() {
        let text = (0..150).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let cut = truncate(&text, MAX_OUTPUT_LINES, MAX_OUTPUT_CHARS);
        assert_eq!(cut.text.lines().count(), 100);
        assert_eq!(cut.notices.len(), 1);

        let long = "x".repeat(12_000);
        let cut = truncate(&long, MAX_OUTPUT_LINES, MAX_OUTPUT_CHARS);
        assert_eq!(cut.text.len(), 10_000);
        assert!(cut.was_truncated());

        assert!(!truncate("short", 100, 10_000).was_truncated());
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("abcdef", 3), "abc...");
        assert_eq!(ellipsize("abc", 3), "abc");
    }
}
