mod api;
mod app;
mod bot_config;
mod cli;
mod config;
mod domain;
mod jobs;
mod panels;
mod view_models;

use app::{APP_NAME, DashboardApp};
use bot_config::BotConfig;
use clap::Parser;
use cli::{Cli, Commands};
use config::{ConfigError, DashboardConfig};
use eframe::NativeOptions;
use std::io::{self, Write};
use thiserror::Error;

fn main() -> Result<(), CliError> {
    // Load .env first so RUST_LOG from it reaches the logger.
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = dotenv {
        log::debug!("No .env file loaded: {err}");
    }

    let cli = Cli::parse();
    execute(&cli, &mut io::stdout().lock())
}

/// Dashboard settings are only resolved by the commands that use them.
fn execute(cli: &Cli, out: &mut impl Write) -> Result<(), CliError> {
    match cli.action() {
        Commands::Run => run_dashboard(dashboard_config(cli)?),
        Commands::BotConfig { include_token } => {
            let bot = BotConfig::from_env();
            let bot = if *include_token { bot } else { bot.without_token() };
            writeln!(out, "{}", bot.to_json_pretty()?)?;
            Ok(())
        }
        Commands::ShowConfig => {
            write!(out, "{}", dashboard_config(cli)?.to_toml()?)?;
            Ok(())
        }
    }
}

fn dashboard_config(cli: &Cli) -> Result<DashboardConfig, ConfigError> {
    DashboardConfig::resolve(cli.config.as_deref(), cli.api_url.clone())
}

fn run_dashboard(config: DashboardConfig) -> Result<(), CliError> {
    log::info!("Connecting dashboard to {}", config.api_base_url);
    let api = api::ApiClient::connect(&config.api_base_url, config.request_timeout())?;
    let scheduler = jobs::PollScheduler::new(config.poll_interval(), config.backoff());

    eframe::run_native(
        APP_NAME,
        NativeOptions::default(),
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, api, scheduler)))),
    )?;
    Ok(())
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to build API client: {0}")]
    Api(#[from] api::FetchError),
    #[error("Failed to serialize bot config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Dashboard window failed: {0}")]
    Gui(#[from] eframe::Error),
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> (Result<(), CliError>, String) {
        let cli = Cli::parse_from(std::iter::once("renovate-dashboard").chain(args.iter().copied()));
        let mut out = Vec::new();
        let result = execute(&cli, &mut out);
        (result, String::from_utf8(out).expect("utf-8 output"))
    }

    #[test]
    fn bot_config_ignores_broken_dashboard_settings() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        let missing = missing.to_str().expect("utf-8 path");

        let (result, output) = run(&["--config", missing, "--api-url", "localhost:5000", "bot-config"]);
        assert!(result.is_ok());
        let value: serde_json::Value = serde_json::from_str(&output).expect("json output");
        assert_eq!(value["platform"], "gitea");
        assert!(value.get("token").is_none());
    }

    #[test]
    fn show_config_reports_dashboard_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        let (result, output) = run(&["--config", missing.to_str().expect("utf-8 path"), "show-config"]);
        assert!(matches!(result, Err(CliError::Config(ConfigError::NotFound(_)))));
        assert!(output.is_empty());
    }

    #[test]
    fn show_config_prints_resolved_settings() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "poll_interval_secs = 45").expect("write");
        let path = file.path().to_str().expect("utf-8 path");

        let (result, output) = run(&["--config", path, "--api-url", "https://renovate.example.com", "show-config"]);
        assert!(result.is_ok());
        assert!(output.contains("poll_interval_secs = 45"));
        assert!(output.contains("https://renovate.example.com"));
    }

    #[test]
    fn show_config_rejects_invalid_url_once_applied() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "request_timeout_secs = 5").expect("write");
        let path = file.path().to_str().expect("utf-8 path");

        let (result, _) = run(&["--config", path, "--api-url", "localhost:5000", "show-config"]);
        assert!(matches!(result, Err(CliError::Config(ConfigError::Invalid(_)))));
    }
}
