// Telegram Bot API client
//
// Only `sendMessage` is needed: alerts and the test notification are
// plain text messages to a single chat.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Public Bot API root.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org/";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Bot API envelope: `{ ok, description?, error_code? }`.
#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    description: Option<String>,
    error_code: Option<u16>,
}

/// Minimal Telegram Bot API client.
///
/// The bot token is passed per call rather than stored, since it is a
/// user-editable setting that may change while the process runs.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: Url,
}

impl TelegramClient {
    pub fn new(api_base: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(api_base, http)
    }

    pub fn from_reqwest(api_base: &str, http: reqwest::Client) -> Result<Self, Error> {
        let api_base = if api_base.ends_with('/') {
            Url::parse(api_base)?
        } else {
            Url::parse(&format!("{api_base}/"))?
        };
        Ok(Self { http, api_base })
    }

    /// Send a plain-text message to `chat_id`.
    pub async fn send_message(&self, token: &str, chat_id: &str, text: &str) -> Result<(), Error> {
        // `./` keeps the `:` inside bot tokens from being read as a scheme.
        let url = self.api_base.join(&format!("./bot{token}/sendMessage"))?;
        debug!(chat_id, "POST {}sendMessage", self.api_base);

        let resp = self
            .http
            .post(url)
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        let parsed: BotResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if parsed.ok {
            Ok(())
        } else {
            Err(Error::Telegram {
                message: parsed
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
                code: parsed.error_code.or(Some(status.as_u16())),
            })
        }
    }
}
