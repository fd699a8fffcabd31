//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates` with an offset and delivers text and document
//! replies over the HTTPS bot API. The dispatcher owns retry policy; this
//! module only speaks the wire protocol.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Server-side long-poll window for `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 25;
/// Client-side bound for a single non-polling API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One inbound update. Only message updates are requested.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// The bot API envelope: `ok` plus either `result` or `description`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build telegram http client")?;
        Ok(Self {
            http,
            base_url: format!("https://api.telegram.org/bot{token}"),
        })
    }

    /// Fetch pending updates at `offset`, blocking server-side up to the
    /// poll window.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response = self
            .http
            .get(format!("{}/getUpdates", self.base_url))
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .query(&[
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("offset", offset.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await
            .context("getUpdates request failed")?;
        Self::unwrap_response(response).await
    }

    /// Send a text reply, optionally with a parse mode.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<()> {
        let mut query = vec![
            ("chat_id", chat_id.to_string()),
            ("text", text.to_string()),
        ];
        if let Some(mode) = parse_mode {
            query.push(("parse_mode", mode.to_string()));
        }
        let response = self
            .http
            .get(format!("{}/sendMessage", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .query(&query)
            .send()
            .await
            .context("sendMessage request failed")?;
        let _: serde_json::Value = Self::unwrap_response(response).await?;
        Ok(())
    }

    /// Send a document attachment via multipart upload.
    pub async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .context("invalid document mime type")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);
        let response = self
            .http
            .post(format!("{}/sendDocument", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .context("sendDocument request failed")?;
        let _: serde_json::Value = Self::unwrap_response(response).await?;
        Ok(())
    }

    async fn unwrap_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("telegram response body read failed")?;
        if !status.is_success() {
            anyhow::bail!("telegram returned status {}: {}", status.as_u16(), body);
        }
        let payload: ApiResponse<T> =
            serde_json::from_str(&body).context("telegram response was not valid JSON")?;
        if !payload.ok {
            anyhow::bail!(
                "telegram API error: {}",
                payload.description.unwrap_or_else(|| "ok=false".to_string())
            );
        }
        payload
            .result
            .context("telegram response missing result")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_envelope_deserializes() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 7, "message": {"message_id": 1, "chat": {"id": 4242, "type": "private"}, "text": "/metrics"}},
                {"update_id": 8, "message": {"message_id": 2, "chat": {"id": 4242, "type": "private"}}}
            ]
        }"#;
        let payload: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        assert!(payload.ok);
        let updates = payload.result.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].update_id, 7);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 4242);
        assert_eq!(message.text.as_deref(), Some("/metrics"));
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
    }

    #[test]
    fn test_error_envelope_deserializes() {
        let body = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let payload: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        assert!(!payload.ok);
        assert_eq!(payload.description.as_deref(), Some("Unauthorized"));
        assert!(payload.result.is_none());
    }
}
