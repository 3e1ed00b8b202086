use anyhow::{Context, Result};

use crate::search::session::DEFAULT_IDLE_TTL;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub candidate_api_url: String,
    pub candidate_api_token: Option<String>,
    pub candidate_api_timeout_secs: u64,
    pub session_idle_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            candidate_api_url: require_env("CANDIDATE_API_URL")?,
            candidate_api_token: std::env::var("CANDIDATE_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            candidate_api_timeout_secs: std::env::var("CANDIDATE_API_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("CANDIDATE_API_TIMEOUT_SECS must be a whole number of seconds")?,
            session_idle_ttl_secs: std::env::var("SESSION_IDLE_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_IDLE_TTL.as_secs().to_string())
                .parse::<u64>()
                .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };
        anyhow::ensure!(
            config.session_idle_ttl_secs > 0,
            "SESSION_IDLE_TTL_SECS must be greater than zero"
        );
        Ok(config)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
