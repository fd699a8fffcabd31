//! Process configuration.
//!
//! Loaded once from the environment at startup (a `.env` file is honored if
//! present) and passed explicitly to the dispatcher and reporters. The
//! allowed chat id doubles as the authorization guard: it is the single
//! identity the bot will answer.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_REPORT_PATH: &str = "/tmp/opsbot-report.txt";

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub prometheus_url: String,
    pub allowed_chat_id: i64,
    /// Transient file the connection report is written to, overwritten per run.
    pub report_path: PathBuf,
    /// Upper bound for one Metrics Store query.
    pub query_timeout: Duration,
    /// Upper bound for one host tool invocation.
    pub tool_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let telegram_token =
            std::env::var("TELEGRAM_API_KEY").context("TELEGRAM_API_KEY is not set")?;
        let prometheus_url =
            std::env::var("PROMETHEUS_URL").context("PROMETHEUS_URL is not set")?;
        let allowed_chat_id = std::env::var("ALLOW_CHAT_ID")
            .context("ALLOW_CHAT_ID is not set")?
            .trim()
            .parse::<i64>()
            .context("ALLOW_CHAT_ID must be a numeric chat id")?;
        let report_path = std::env::var("REPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORT_PATH));

        Ok(Self {
            telegram_token,
            prometheus_url,
            allowed_chat_id,
            report_path,
            query_timeout: Duration::from_secs(10),
            tool_timeout: Duration::from_secs(15),
        })
    }

    /// Authorization guard: only the configured chat is served. Deny is
    /// silent at the call sites so the bot stays invisible elsewhere.
    pub fn is_allowed_chat(&self, chat_id: i64) -> bool {
        chat_id == self.allowed_chat_id
    }
}
