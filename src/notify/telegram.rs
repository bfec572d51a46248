use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::SegmentSink;
use crate::error::{bounded_body, DeliveryError};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Posts HTML-formatted text to one chat via the Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramSender {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramSender {
    pub fn new(client: Client, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }

    fn payload<'a>(&'a self, text: &'a str) -> SendMessage<'a> {
        SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        }
    }
}

/// Telegram answers 200 with `ok: false` in a few edge cases; treat that as a failure too.
fn check_reply(body: &str) -> Result<(), DeliveryError> {
    match serde_json::from_str::<ApiReply>(body) {
        Ok(reply) if reply.ok => Ok(()),
        Ok(reply) => Err(DeliveryError::Rejected(
            reply.description.unwrap_or_else(|| bounded_body(body)),
        )),
        Err(_) => Err(DeliveryError::Rejected(bounded_body(body))),
    }
}

#[async_trait]
impl SegmentSink for TelegramSender {
    async fn send_segment(&self, text: &str) -> Result<(), DeliveryError> {
        let rsp = self
            .client
            .post(self.endpoint())
            .json(&self.payload(text))
            .send()
            .await
            // reqwest errors embed the URL, which carries the bot token
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        let status = rsp.status();
        let body = rsp
            .text()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;
        if !status.is_success() {
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                body: bounded_body(&body),
            });
        }
        check_reply(&body)
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
