use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Placeholder JWT secrets that should never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub store_timeout: Duration,
    pub token_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HUDDLE_HOST", "0.0.0.0");
        let port: u16 = var("HUDDLE_PORT", "5000").parse().context("HUDDLE_PORT")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("HUDDLE_HOST/HUDDLE_PORT")?;

        let store_timeout_ms: u64 = var("HUDDLE_STORE_TIMEOUT_MS", "5000")
            .parse()
            .context("HUDDLE_STORE_TIMEOUT_MS")?;
        let token_ttl_hours: i64 = var("HUDDLE_TOKEN_TTL_HOURS", "24")
            .parse()
            .context("HUDDLE_TOKEN_TTL_HOURS")?;
        anyhow::ensure!(token_ttl_hours > 0, "HUDDLE_TOKEN_TTL_HOURS must be positive");

        Ok(Self {
            jwt_secret: var("HUDDLE_JWT_SECRET", DEFAULT_SECRET),
            db_path: var("HUDDLE_DB_PATH", "huddle.db").into(),
            addr,
            store_timeout: Duration::from_millis(store_timeout_ms),
            token_ttl: chrono::Duration::hours(token_ttl_hours),
        })
    }

    pub fn has_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}
