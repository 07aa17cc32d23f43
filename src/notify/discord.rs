//! Discord webhook transport

use super::channel::{ChannelError, ChannelTransport};
use super::http::truncate_chars;
use crate::config::{ChannelConfig, ChannelKind};
use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::json;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const CONTENT_LIMIT: usize = 2000;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<b>(.*?)</b>").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<i>(.*?)</i>").unwrap());
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<code>(.*?)</code>").unwrap());
static OTHER_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").unwrap());

/// Rewrite the HTML subset used in messages as Discord markdown.
pub fn html_to_markdown(html: &str) -> String {
    let text = BOLD.replace_all(html, "**$1**");
    let text = ITALIC.replace_all(&text, "*$1*");
    let text = CODE.replace_all(&text, "`$1`");
    let text = OTHER_TAG.replace_all(&text, "");
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Posts to a Discord webhook URL
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
}

impl DiscordWebhook {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn check(response: Response) -> Result<(), ChannelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ChannelError::Rejected {
            channel: ChannelKind::Discord,
            status: status.as_u16(),
            body: truncate_chars(&body, 300),
        })
    }
}

#[async_trait]
impl ChannelTransport for DiscordWebhook {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    async fn send_text(&self, channel: &ChannelConfig, text: &str) -> Result<(), ChannelError> {
        let content = truncate_chars(&html_to_markdown(text), CONTENT_LIMIT);
        let response = self
            .client
            .post(&channel.webhook)
            .timeout(SEND_TIMEOUT)
            .json(&json!({ "content": content }))
            .send()
            .await?;

        Self::check(response).await
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

        let payload = json!({
            "content": truncate_chars(&html_to_markdown(caption), CONTENT_LIMIT),
        });
        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime::IMAGE_JPEG.as_ref())?;
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", part);

        let response = self
            .client
            .post(&channel.webhook)
            .timeout(SEND_TIMEOUT)
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await
    }
}
