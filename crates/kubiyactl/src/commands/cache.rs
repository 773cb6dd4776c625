//! Cache maintenance for native tools (`<workspace>/<tool>-data/cache`)

use anyhow::Result;
use clap::Subcommand;
use kubiya_tools::cache::{derive_key, TimeBucket};
use kubiya_tools::ToolsConfig;
use std::time::{Duration, SystemTime};

use kubiya_tools::output::render_table;

/// Tools that keep a response cache
const CACHED_TOOLS: &[&str] = &["argocd", "observe"];

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show file counts and sizes per cached operation
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// List cache files
    List,

    /// Delete cache files older than --max-age
    Cleanup {
        /// Maximum age to keep (e.g. 30m, 24h, 7d)
        #[arg(long, default_value = "24h", value_parser = humantime::parse_duration)]
        max_age: Duration,
    },

    /// Delete all cache files
    Clear,

    /// Print the cache file name for an operation and its parameters
    Key {
        /// Operation (e.g. apps, clusters, dataset)
        operation: String,

        /// Ordered key parameters; pass "" to keep an empty slot
        params: Vec<String>,

        /// Time bucket: hour, minute, day, or a literal bucket string
        #[arg(long, default_value = "hour")]
        bucket: String,
    },
}

pub async fn execute(config: &ToolsConfig, tool: &str, command: CacheCommands) -> Result<()> {
    if !CACHED_TOOLS.contains(&tool) {
        anyhow::bail!("Tool '{}' has no cache (expected one of: {})", tool, CACHED_TOOLS.join(", "));
    }
    let cache = config.cache_for(tool);

    match command {
        CacheCommands::Status { output } => {
            let stats = cache.stats().await?;
            if output == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            println!("Cache directory: {}", cache.dir().display());
            println!("Files: {}", stats.files);
            println!("Total size: {} bytes", stats.total_bytes);
            println!("Written in the last hour: {}", stats.recent);
            if !stats.by_prefix.is_empty() {
                println!();
                let rows = stats
                    .by_prefix
                    .iter()
                    .map(|(prefix, count)| vec![prefix.clone(), count.to_string()])
                    .collect();
                println!("{}", render_table(&["OPERATION", "FILES"], rows));
            }
        }
        CacheCommands::List => {
            let files = cache.list().await?;
            if files.is_empty() {
                println!("No cache files in {}", cache.dir().display());
                return Ok(());
            }
            let now = SystemTime::now();
            let rows = files
                .iter()
                .map(|f| {
                    let age = now.duration_since(f.modified).unwrap_or_default();
                    vec![
                        f.name.clone(),
                        f.size.to_string(),
                        humantime::format_duration(Duration::from_secs(age.as_secs())).to_string(),
                    ]
                })
                .collect();
            println!("{}", render_table(&["NAME", "SIZE", "AGE"], rows));
        }
        CacheCommands::Cleanup { max_age } => {
            let removed = cache.invalidate_older_than(max_age).await?;
            println!(
                "Removed {} cache files older than {}",
                removed,
                humantime::format_duration(max_age)
            );
        }
        CacheCommands::Clear => {
            let removed = cache.clear().await?;
            println!("Removed {} cache files", removed);
        }
        CacheCommands::Key {
            operation,
            params,
            bucket,
        } => {
            let key = derive_key(&operation, params.as_slice(), &TimeBucket::parse(&bucket).current());
            println!("{}", key.file_name());
        }
    }

    Ok(())
}
