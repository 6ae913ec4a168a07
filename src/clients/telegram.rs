use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::retry::RetryPolicy;

use super::{Publisher, read_json};

const SERVICE: &str = "telegram";
const PARSE_MODE: &str = "HTML";

/// Posts to one channel through the Telegram Bot API.
pub struct TelegramPublisher {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
    chat_id: String,
    retry: RetryPolicy,
}

impl TelegramPublisher {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        bot_token: SecretString,
        chat_id: &str,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id: chat_id.to_string(),
            retry,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_token.expose_secret(),
            method
        )
    }

    async fn call<B: Serialize + Sync>(&self, method: &str, body: &B) -> Result<(), ApiError> {
        let url = self.method_url(method);
        let http = &self.http;
        let url = url.as_str();
        let reply: BotReply = self
            .retry
            .run(SERVICE, move || async move {
                let response = http
                    .post(url)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| ApiError::from_reqwest(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await?;

        if !reply.ok {
            return Err(ApiError::Rejected {
                service: SERVICE,
                status: reply.error_code.unwrap_or(400),
                detail: reply
                    .description
                    .unwrap_or_else(|| "request not ok".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn send_text(&self, text: &str) -> Result<(), ApiError> {
        tracing::info!(chat = %self.chat_id, chars = text.chars().count(), "sending text message");
        self.call(
            "sendMessage",
            &SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode: PARSE_MODE,
            },
        )
        .await
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), ApiError> {
        tracing::info!(chat = %self.chat_id, photo = photo_url, "sending photo message");
        self.call(
            "sendPhoto",
            &SendPhoto {
                chat_id: &self.chat_id,
                photo: photo_url,
                caption,
                parse_mode: PARSE_MODE,
            },
        )
        .await
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Serialize)]
struct SendPhoto<'a> {
    chat_id: &'a str,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct BotReply {
    ok: bool,
    description: Option<String>,
    error_code: Option<u16>,
}
