use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kubiya_tools::{ToolRegistry, ToolsConfig};

use crate::commands;

/// Kubiya CLI - kubectl-style discovery and execution of tool plugins
#[derive(Parser, Debug)]
#[command(name = "kubiyactl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Tools configuration file (YAML)
    #[arg(long, short = 'c', global = true, env = "KUBIYA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Workspace directory holding `<tool>-data/cache` (overrides the config file)
    #[arg(long, short = 'w', global = true, env = "KUBIYA_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List resources (verb-first: get tools, get groups)
    Get {
        /// Resource type (tools, groups)
        resource_type: String,

        /// Only tools registered under this group (e.g. argocd_cli)
        #[arg(long, short = 'g')]
        group: Option<String>,

        /// Output format (wide, json, yaml, name)
        #[arg(short, long, default_value = "wide")]
        output: String,
    },

    /// Describe a resource in detail (verb-first: describe tool <name>)
    Describe {
        /// Resource type (tool)
        resource_type: String,

        /// Resource name
        name: String,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Run a tool and exit with its exit code
    Run {
        /// Tool name
        tool: String,

        /// Tool argument as key=value (repeatable)
        #[arg(long = "arg", short = 'a', value_name = "KEY=VALUE")]
        args: Vec<String>,

        /// Environment variable for this call as KEY=VALUE (repeatable)
        #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Arguments as a JSON object, merged under --arg
        #[arg(long)]
        args_json: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Inspect and maintain a tool's response cache
    Cache {
        /// Tool whose cache to use (argocd, observe)
        #[arg(long, short = 't', global = true, default_value = "argocd")]
        tool: String,

        #[command(subcommand)]
        command: commands::cache::CacheCommands,
    },

    /// Show version information
    Version,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: commands::completion::Shell,
    },
}

impl Cli {
    /// Run the command; the returned code becomes the process exit status
    pub async fn execute(self) -> anyhow::Result<i32> {
        let config = self.load_config()?;

        match self.command {
            Commands::Get {
                resource_type,
                group,
                output,
            } => {
                let registry = ToolRegistry::with_all_defaults(&config);
                commands::get::execute(&registry, &resource_type, group.as_deref(), &output)?;
                Ok(0)
            }
            Commands::Describe {
                resource_type,
                name,
                output,
            } => {
                let registry = ToolRegistry::with_all_defaults(&config);
                commands::describe::execute(&registry, &resource_type, &name, &output)?;
                Ok(0)
            }
            Commands::Run {
                tool,
                args,
                env,
                args_json,
                output,
            } => {
                let registry = ToolRegistry::with_all_defaults(&config);
                commands::run::execute(registry, &tool, &args, &env, args_json.as_deref(), &output).await
            }
            Commands::Cache { tool, command } => {
                commands::cache::execute(&config, &tool, command).await?;
                Ok(0)
            }
            Commands::Version => {
                commands::version::execute(&config);
                Ok(0)
            }
            Commands::Completion { shell } => {
                commands::completion::execute(shell)?;
                Ok(0)
            }
        }
    }

    fn load_config(&self) -> anyhow::Result<ToolsConfig> {
        let mut config = ToolsConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.workspace {
            config = config.with_workspace(dir);
        }
        tracing::debug!(workspace = %config.workspace_dir.display(), "Loaded configuration");
        Ok(config)
    }
}
