//! Shell completion generation for kubiyactl
//!
//! - kubiyactl completion bash > /etc/bash_completion.d/kubiyactl
//! - kubiyactl completion zsh  > ~/.zsh/completion/_kubiyactl
//! - kubiyactl completion fish > ~/.config/fish/completions/kubiyactl.fish

use anyhow::Result;
use clap::{CommandFactory, ValueEnum};
use clap_complete::{generate, Shell as ClapShell};
use std::io;

use crate::cli::Cli;

/// Supported shells for completion
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl From<Shell> for ClapShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => ClapShell::Bash,
            Shell::Zsh => ClapShell::Zsh,
            Shell::Fish => ClapShell::Fish,
            Shell::Powershell => ClapShell::PowerShell,
        }
    }
}

impl Shell {
    /// One-line install hint, printed to stderr
    fn install_hint(self) -> &'static str {
        match self {
            Shell::Bash => "# Add to ~/.bashrc: source <(kubiyactl completion bash)",
            Shell::Zsh => "# Add to ~/.zshrc: source <(kubiyactl completion zsh), then run compinit",
            Shell::Fish => "# Save to ~/.config/fish/completions/kubiyactl.fish",
            Shell::Powershell => "# Save to kubiyactl.ps1 and dot-source it from your profile",
        }
    }
}

/// Generate shell completion script
pub fn execute(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(ClapShell::from(shell), &mut cmd, name, &mut io::stdout());

    eprintln!();
    eprintln!("{}", shell.install_hint());
    Ok(())
}
