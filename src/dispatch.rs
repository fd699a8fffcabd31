//! Command dispatch: authorization gating, reporter selection, delivery.
//!
//! The dispatcher long-polls the gateway and runs each inbound command in
//! its own task. Reporter failures become an `Error: <detail>` reply; the
//! poll loop itself survives arbitrarily many failed commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::gateway::{TelegramClient, Update};
use crate::prometheus::PrometheusClient;
use crate::reporters::{self, ParseMode, Report, ReportError};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// The command registry. Unknown commands are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Metrics,
    Netstat,
    Traffic,
    TopIps,
}

impl Command {
    /// Match an inbound message against the registry, tolerating a trailing
    /// `@botname` mention.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.trim().split_whitespace().next()?;
        let name = token.split_once('@').map(|(name, _)| name).unwrap_or(token);
        match name {
            "/start" => Some(Self::Start),
            "/metrics" => Some(Self::Metrics),
            "/netstat" => Some(Self::Netstat),
            "/traffic" => Some(Self::Traffic),
            "/topips" => Some(Self::TopIps),
            _ => None,
        }
    }
}

/// Decide whether an inbound update gets served. Parsing and the
/// authorization guard both live here; anything filtered out produces no
/// reply at all. Deny is silent so the bot leaks nothing to chats it does
/// not serve.
fn admit(config: &BotConfig, update: &Update) -> Option<(i64, Command)> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?;
    let command = Command::parse(text)?;
    if !config.is_allowed_chat(message.chat.id) {
        debug!(
            chat_id = message.chat.id,
            "ignoring command from unauthorized chat"
        );
        return None;
    }
    Some((message.chat.id, command))
}

pub struct Dispatcher {
    config: BotConfig,
    gateway: TelegramClient,
    store: PrometheusClient,
    /// Serializes transient report file access across /netstat invocations.
    report_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(config: BotConfig) -> Result<Self> {
        let gateway = TelegramClient::new(&config.telegram_token)
            .context("failed to create telegram client")?;
        let store = PrometheusClient::new(&config.prometheus_url, config.query_timeout)
            .context("failed to create prometheus client")?;
        Ok(Self {
            config,
            gateway,
            store,
            report_lock: Mutex::new(()),
        })
    }

    /// Long-poll loop. Runs until the process is terminated externally.
    pub async fn run(self: Arc<Self>) {
        info!("dispatcher started, polling for commands");
        let mut offset = 0i64;
        loop {
            let updates = match self.gateway.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed: {:#}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };
            for update in updates {
                if update.update_id >= offset {
                    offset = update.update_id + 1;
                }
                let dispatcher = Arc::clone(&self);
                tokio::spawn(async move {
                    dispatcher.handle_update(update).await;
                });
            }
        }
    }

    async fn handle_update(&self, update: Update) {
        let Some((chat_id, command)) = admit(&self.config, &update) else {
            return;
        };

        info!(chat_id, ?command, "handling command");
        let outcome = self.run_command(command).await;
        if let Err(e) = self.deliver(chat_id, outcome).await {
            // last-resort boundary: delivery problems are logged, never raised
            error!("failed to deliver {:?} reply: {:#}", command, e);
        }
    }

    async fn run_command(&self, command: Command) -> Result<Report, ReportError> {
        match command {
            Command::Start => Ok(Report::Text {
                body: "Hi! I only work in this chat.".to_string(),
                mode: ParseMode::Plain,
            }),
            Command::Metrics => reporters::metrics::report(&self.store).await,
            Command::Netstat => {
                reporters::connections::report(&self.config, &self.report_lock).await
            }
            Command::Traffic => reporters::traffic::report(&self.config).await,
            Command::TopIps => reporters::top_ips::report(&self.config).await,
        }
    }

    async fn deliver(&self, chat_id: i64, outcome: Result<Report, ReportError>) -> Result<()> {
        match outcome {
            Ok(Report::Text { body, mode }) => {
                self.gateway
                    .send_message(chat_id, &body, mode.as_api_str())
                    .await
            }
            Ok(Report::Document {
                file_name,
                caption,
                bytes,
            }) => {
                self.gateway
                    .send_document(chat_id, &file_name, bytes, &caption)
                    .await
            }
            Err(e) => {
                warn!("reporter failed: {}", e);
                self.gateway
                    .send_message(chat_id, &format!("Error: {e}"), None)
                    .await
            }
        }
    }
}
