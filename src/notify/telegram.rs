//! Telegram Bot API: outbound messages and the inbound command feed

use super::channel::{ChannelError, ChannelTransport};
use super::http::truncate_chars;
use crate::commands::{CommandCursor, CommandSource, CommandSourceError, InboundCommand};
use crate::config::{ChannelConfig, ChannelKind, Config};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const SEND_MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);
const SEND_PHOTO_TIMEOUT: Duration = Duration::from_secs(30);
const GET_UPDATES_TIMEOUT: Duration = Duration::from_secs(5);

const MESSAGE_LIMIT: usize = 4096;
const CAPTION_LIMIT: usize = 1024;

/// Telegram bot client
#[derive(Debug, Clone)]
pub struct TelegramApi {
    client: Client,
}

impl TelegramApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn method_url(channel: &ChannelConfig, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            channel.api_base.trim_end_matches('/'),
            channel.bot_token,
            method
        )
    }

    async fn check(response: Response) -> Result<Response, ChannelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ChannelError::Rejected {
            channel: ChannelKind::Telegram,
            status: status.as_u16(),
            body: truncate_chars(&body, 300),
        })
    }
}

#[async_trait]
impl ChannelTransport for TelegramApi {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send_text(&self, channel: &ChannelConfig, text: &str) -> Result<(), ChannelError> {
        let text = truncate_chars(text, MESSAGE_LIMIT);
        let response = self
            .client
            .post(Self::method_url(channel, "sendMessage"))
            .timeout(SEND_MESSAGE_TIMEOUT)
            .form(&[
                ("chat_id", channel.chat_id.as_str()),
                ("text", text.as_str()),
                ("parse_mode", "HTML"),
            ])
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        channel: &ChannelConfig,
        photo: &Path,
        caption: &str,
    ) -> Result<(), ChannelError> {
        let data = tokio::fs::read(photo).await?;
        let file_name = photo
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot.jpg".to_string());

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime::IMAGE_JPEG.as_ref())?;
        let form = Form::new()
            .text("chat_id", channel.chat_id.clone())
            .text("caption", truncate_chars(caption, CAPTION_LIMIT))
            .text("parse_mode", "HTML")
            .part("photo", part);

        let response = self
            .client
            .post(Self::method_url(channel, "sendPhoto"))
            .timeout(SEND_PHOTO_TIMEOUT)
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await?;
        debug!(photo = %photo.display(), "Telegram photo sent");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

impl From<Update> for InboundCommand {
    fn from(update: Update) -> Self {
        let (sender, text) = match update.message {
            Some(message) => (message.chat.id.to_string(), message.text),
            None => (String::new(), None),
        };
        InboundCommand {
            id: update.update_id,
            sender,
            text,
        }
    }
}

#[async_trait]
impl CommandSource for TelegramApi {
    fn reply_channel(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn poll(
        &self,
        config: &Config,
        cursor: CommandCursor,
    ) -> Result<Vec<InboundCommand>, CommandSourceError> {
        let channel = &config.telegram;
        if !ChannelKind::Telegram.is_ready(channel) {
            return Ok(Vec::new());
        }

        let mut query = vec![("timeout", "0".to_string())];
        if let Some(offset) = cursor.next_offset() {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .client
            .get(Self::method_url(channel, "getUpdates"))
            .timeout(GET_UPDATES_TIMEOUT)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let body: UpdatesResponse = response.json().await?;
        if !body.ok {
            return Err(CommandSourceError::Rejected(
                body.description.unwrap_or_else(|| "ok=false".to_string()),
            ));
        }

        Ok(body.result.into_iter().map(InboundCommand::from).collect())
    }
}
