use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "renovate-dashboard",
    version,
    about = "Dashboard for a self-hosted Renovate installation"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Dashboard config file (TOML)")]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Backend origin serving /graphql and /health"
    )]
    pub api_url: Option<String>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Open the dashboard window (default)
    Run,
    /// Print the Renovate bot configuration as JSON
    BotConfig {
        #[arg(long, default_value_t = false)]
        include_token: bool,
    },
    /// Print the effective dashboard configuration as TOML
    ShowConfig,
}

impl Cli {
    pub fn action(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Run)
    }
}
