//! Settings handed to the self-hosted Renovate bot.
//!
//! The bot reads these once at startup and is their only interpreter, so
//! nothing here validates values beyond what the types enforce.

use std::{env, str::FromStr};

use serde::Serialize;
use thiserror::Error;

pub const ENDPOINT_ENV: &str = "RENOVATE_ENDPOINT";
pub const TOKEN_ENV: &str = "RENOVATE_TOKEN";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const AUTOMERGE_TYPE_ENV: &str = "RENOVATE_AUTOMERGE_TYPE";
const DEFAULT_ENDPOINT: &str = "http://gitea:3000";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    pub platform: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    pub autodiscover: bool,
    pub autodiscover_filter: Vec<String>,

    pub log_level: LogLevel,
    pub log_file: String,
    pub log_file_level: LogLevel,

    pub git_author: String,

    pub onboarding: bool,
    pub onboarding_config: OnboardingConfig,

    pub pr_hourly_limit: u32,
    pub pr_concurrent_limit: u32,

    pub automerge: bool,
    pub automerge_type: AutomergeType,

    pub dependency_dashboard: bool,
    pub dependency_dashboard_title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OnboardingConfig {
    pub extends: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomergeType {
    Pr,
    Branch,
    PrComment,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownValue {
    kind: &'static str,
    value: String,
}

impl FromStr for LogLevel {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(UnknownValue {
                kind: "log level",
                value: value.to_owned(),
            }),
        }
    }
}

impl FromStr for AutomergeType {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pr" => Ok(Self::Pr),
            "branch" => Ok(Self::Branch),
            "pr-comment" => Ok(Self::PrComment),
            _ => Err(UnknownValue {
                kind: "automerge type",
                value: value.to_owned(),
            }),
        }
    }
}

/// Parses an override, keeping `default` when the value is unknown.
fn parse_or<T: FromStr<Err = UnknownValue>>(key: &str, value: Option<String>, default: T) -> T {
    let Some(value) = value else {
        return default;
    };
    value.parse().unwrap_or_else(|err| {
        log::warn!("Ignoring {key}: {err}");
        default
    })
}

impl BotConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the shipped configuration, pulling the endpoint, token, log
    /// level and automerge type through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let log_level = parse_or(LOG_LEVEL_ENV, non_empty(LOG_LEVEL_ENV), LogLevel::Debug);
        Self {
            platform: "gitea".to_owned(),
            endpoint: non_empty(ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            token: non_empty(TOKEN_ENV),
            autodiscover: true,
            autodiscover_filter: vec!["*/*".to_owned()],
            log_level,
            log_file: "/tmp/renovate.log".to_owned(),
            log_file_level: LogLevel::Debug,
            git_author: "Renovate Bot <renovate@localhost>".to_owned(),
            onboarding: true,
            onboarding_config: OnboardingConfig {
                extends: vec!["config:recommended".to_owned()],
            },
            pr_hourly_limit: 10,
            pr_concurrent_limit: 5,
            automerge: false,
            automerge_type: parse_or(
                AUTOMERGE_TYPE_ENV,
                non_empty(AUTOMERGE_TYPE_ENV),
                AutomergeType::Pr,
            ),
            dependency_dashboard: true,
            dependency_dashboard_title: "Dependency Dashboard".to_owned(),
        }
    }

    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
