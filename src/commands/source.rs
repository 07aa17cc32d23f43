use crate::config::{ChannelKind, Config};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandSourceError {
    #[error("Command poll failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Command source rejected the poll: {0}")]
    Rejected(String),
}

/// One item fetched from the command source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub id: i64,
    /// Identity of the originating chat
    pub sender: String,
    /// `None` for non-text items (photos, stickers, edits, ...)
    pub text: Option<String>,
}

/// Id of the last fetched item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCursor(Option<i64>);

impl CommandCursor {
    pub fn new(last: Option<i64>) -> Self {
        Self(last)
    }

    pub fn last(&self) -> Option<i64> {
        self.0
    }

    /// First id the next poll should return.
    pub fn next_offset(&self) -> Option<i64> {
        self.0.map(|id| id + 1)
    }

    /// Move past `id`; the cursor never goes backwards.
    pub fn advance_past(&mut self, id: i64) {
        self.0 = Some(self.0.map_or(id, |last| last.max(id)));
    }
}

/// Inbound command feed
///
/// Delivery is at-least-once: a poll returns every item after the cursor,
/// in order, and may return an item again only if the cursor was not
/// advanced past it.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Channel that replies go out on; its `chat_id` is the allowed sender.
    fn reply_channel(&self) -> ChannelKind;

    async fn poll(
        &self,
        config: &Config,
        cursor: CommandCursor,
    ) -> Result<Vec<InboundCommand>, CommandSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_advances_monotonically() {
        let mut cursor = CommandCursor::default();
        assert_eq!(cursor.next_offset(), None);

        cursor.advance_past(10);
        cursor.advance_past(7);
        assert_eq!(cursor.last(), Some(10));
        assert_eq!(cursor.next_offset(), Some(11));
    }
}
