use crate::config::{ChannelConfig, ChannelKind};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0} channel is disabled or missing credentials")]
    NotReady(ChannelKind),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} rejected the request ({status}): {body}")]
    Rejected {
        channel: ChannelKind,
        status: u16,
        body: String,
    },

    #[error("Failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}

/// Wire transport of one notification channel
///
/// Implementations may assume the channel section is ready (enabled and
/// credentialed); the dispatcher checks that before calling.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// `text` is HTML-formatted (`<b>`, `<i>`, `<code>`).
    async fn send_text(&self, channel: &ChannelConfig, text: &str) -> Result<(), ChannelError>;

    async fn send_photo(
        &self,
        channel: &ChannelConfig,
        photo: &Path,
        caption: &str,
    ) -> Result<(), ChannelError>;
}
