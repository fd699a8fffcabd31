//! opsbot - chat-driven operations console for a single server.
//!
//! Listens for commands in one authorized Telegram chat and reports server
//! health signals:
//! - /metrics - application metrics from the Prometheus backend
//! - /netstat - active network connections, delivered as a document
//! - /traffic - vnstat traffic totals
//! - /topips  - top remote IPs by connection count

mod config;
mod dispatch;
mod execution;
mod format;
mod gateway;
mod prometheus;
mod reporters;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("opsbot=info")),
        )
        .init();

    let config = config::BotConfig::from_env().context("failed to load configuration")?;
    info!(
        allowed_chat_id = config.allowed_chat_id,
        report_path = %config.report_path.display(),
        "opsbot starting"
    );

    let dispatcher =
        Arc::new(dispatch::Dispatcher::new(config).context("failed to create dispatcher")?);
    dispatcher.run().await;
    Ok(())
}
