use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{LlmSettings, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm: LlmSettings,
    /// When unset, the store indexes in memory and relies on the file tree for durability.
    pub database_url: Option<String>,
    pub results_dir: PathBuf,
    pub scoring_policy_path: Option<PathBuf>,
    pub component_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm: LlmSettings {
                model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_attempts: optional_env("LLM_MAX_ATTEMPTS")
                    .unwrap_or_else(|| "3".to_string())
                    .parse::<u32>()
                    .context("LLM_MAX_ATTEMPTS must be a positive whole number")?,
                ..LlmSettings::default()
            },
            database_url: optional_env("DATABASE_URL"),
            results_dir: optional_env("RESULTS_DIR")
                .unwrap_or_else(|| "./analysis_results".to_string())
                .into(),
            scoring_policy_path: optional_env("SCORING_POLICY_PATH").map(PathBuf::from),
            component_timeout: Duration::from_secs(
                optional_env("COMPONENT_TIMEOUT_SECS")
                    .unwrap_or_else(|| "45".to_string())
                    .parse::<u64>()
                    .context("COMPONENT_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
