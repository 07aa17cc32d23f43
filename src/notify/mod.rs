//! Notification channels
//!
//! [`NotificationDispatcher`] owns one [`ChannelTransport`] per channel kind
//! and enforces readiness uniformly: a channel that is disabled or lacks
//! credentials is inert, and every send on it returns `false` without
//! touching the network. Transport errors are logged and also reported as
//! `false`; nothing here returns an error to the caller.

pub mod channel;
pub mod discord;
pub mod http;
pub mod messages;
pub mod schedule;
pub mod telegram;
pub mod template;

pub use channel::{ChannelError, ChannelTransport};
pub use discord::DiscordWebhook;
pub use http::{HttpConfig, build_client};
pub use schedule::{ScheduleBook, ScheduleState};
pub use telegram::TelegramApi;

use crate::config::{ChannelKind, Config};
use crate::observability::Metrics;
use crate::status::StatusSnapshot;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct NotificationDispatcher {
    transports: BTreeMap<ChannelKind, Arc<dyn ChannelTransport>>,
    metrics: Arc<Metrics>,
}

impl NotificationDispatcher {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            transports: BTreeMap::new(),
            metrics,
        }
    }

    /// Register (or replace) the transport for its channel kind.
    pub fn with_transport(mut self, transport: Arc<dyn ChannelTransport>) -> Self {
        self.transports.insert(transport.kind(), transport);
        self
    }

    /// Dispatcher with the HTTP transports for every channel kind.
    pub fn with_http_transports(metrics: Arc<Metrics>, client: reqwest::Client) -> Self {
        Self::new(metrics)
            .with_transport(Arc::new(TelegramApi::new(client.clone())))
            .with_transport(Arc::new(DiscordWebhook::new(client)))
    }

    pub fn is_ready(&self, config: &Config, kind: ChannelKind) -> bool {
        self.transports.contains_key(&kind) && kind.is_ready(config.channel(kind))
    }

    pub fn ready_channels(&self, config: &Config) -> Vec<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .filter(|kind| self.is_ready(config, *kind))
            .collect()
    }

    pub async fn send_message(&self, config: &Config, kind: ChannelKind, text: &str) -> bool {
        let Some(transport) = self.ready_transport(config, kind) else {
            return false;
        };

        let result = transport.send_text(config.channel(kind), text).await;
        self.settle(kind, "message", result)
    }

    pub async fn send_message_with_attachment(
        &self,
        config: &Config,
        kind: ChannelKind,
        path: &Path,
        caption: &str,
    ) -> bool {
        let Some(transport) = self.ready_transport(config, kind) else {
            return false;
        };

        let result = transport
            .send_photo(config.channel(kind), path, caption)
            .await;
        self.settle(kind, "photo", result)
    }

    /// Send `text` on every ready channel; returns how many delivered it.
    pub async fn broadcast(&self, config: &Config, text: &str) -> usize {
        let mut delivered = 0;
        for kind in self.ready_channels(config) {
            if self.send_message(config, kind, text).await {
                delivered += 1;
            }
        }
        delivered
    }

    pub async fn broadcast_with_attachment(
        &self,
        config: &Config,
        path: &Path,
        caption: &str,
    ) -> usize {
        let mut delivered = 0;
        for kind in self.ready_channels(config) {
            if self
                .send_message_with_attachment(config, kind, path, caption)
                .await
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Send the templated status message on every ready channel whose
    /// schedule is due at `now`. Returns the channels that were due.
    ///
    /// A due slot counts as used even if delivery fails.
    pub async fn dispatch_scheduled(
        &self,
        config: &Config,
        book: &mut ScheduleBook,
        now: NaiveDateTime,
    ) -> Vec<ChannelKind> {
        let mut fired = Vec::new();
        let mut snapshot: Option<StatusSnapshot> = None;

        for kind in self.ready_channels(config) {
            let channel = config.channel(kind);
            let Some(policy) = channel.schedule() else {
                continue;
            };
            if !book.poll(kind, &policy, now) {
                continue;
            }

            let snapshot = snapshot.get_or_insert_with(|| StatusSnapshot::gather(config, now));
            let text = template::render(&channel.message_template, &snapshot.template_context());
            debug!(channel = %kind, "Scheduled notification due");
            self.send_message(config, kind, &text).await;
            fired.push(kind);
        }

        fired
    }

    fn ready_transport(
        &self,
        config: &Config,
        kind: ChannelKind,
    ) -> Option<&Arc<dyn ChannelTransport>> {
        if !kind.is_ready(config.channel(kind)) {
            debug!(channel = %kind, "Channel not ready, skipping send");
            return None;
        }
        self.transports.get(&kind)
    }

    fn settle(&self, kind: ChannelKind, what: &str, result: Result<(), ChannelError>) -> bool {
        let delivered = match result {
            Ok(()) => {
                info!(channel = %kind, what, "Notification sent");
                true
            }
            Err(e) => {
                warn!(channel = %kind, what, error = %e, "Notification failed");
                false
            }
        };
        self.metrics.notification(delivered);
        delivered
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn dispatcher(transport: Arc<RecordingTransport>) -> NotificationDispatcher {
        NotificationDispatcher::new(Arc::new(Metrics::new())).with_transport(transport)
    }

    #[tokio::test]
    async fn test_inert_channel_returns_false() {
        let transport = RecordingTransport::new(ChannelKind::Telegram);
        let dispatcher = dispatcher(transport.clone());
        let mut config = Config::default();
        config.telegram.enabled = true; // no token

        assert!(!dispatcher.send_message(&config, ChannelKind::Telegram, "hi").await);
        assert!(!dispatcher.send_message(&config, ChannelKind::Discord, "hi").await);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_false() {
        let transport = RecordingTransport::failing(ChannelKind::Telegram);
        let dispatcher = dispatcher(transport.clone());
        let mut config = Config::default();
        ready_telegram(&mut config);

        assert!(!dispatcher.send_message(&config, ChannelKind::Telegram, "hi").await);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_scheduled_hour_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let transport = RecordingTransport::new(ChannelKind::Telegram);
        let dispatcher = dispatcher(transport.clone());
        let mut config = Config {
            archive_root: temp_dir.path().to_path_buf(),
            project_name: "Yard".to_string(),
            ..Config::default()
        };
        ready_telegram(&mut config);
        config.telegram.hours = vec![8];
        config.telegram.message_template = "{project} {count} {bogus}".to_string();

        let mut book = ScheduleBook::new(at(7, 0));
        let first = dispatcher.dispatch_scheduled(&config, &mut book, at(8, 0)).await;
        let second = dispatcher.dispatch_scheduled(&config, &mut book, at(8, 5)).await;

        assert_eq!(first, vec![ChannelKind::Telegram]);
        assert!(second.is_empty());

        assert_eq!(transport.texts(), vec!["Yard 0 {bogus}".to_string()]);
    }

    #[tokio::test]
    async fn test_broadcast_counts_deliveries() {
        let telegram = RecordingTransport::new(ChannelKind::Telegram);
        let discord = RecordingTransport::new(ChannelKind::Discord);
        let dispatcher = NotificationDispatcher::new(Arc::new(Metrics::new()))
            .with_transport(telegram.clone())
            .with_transport(discord.clone());
        let mut config = Config::default();
        ready_telegram(&mut config);

        assert_eq!(dispatcher.broadcast(&config, "hello").await, 1);

        config.discord.enabled = true;
        config.discord.webhook = "https://discord.example/hook".to_string();
        assert_eq!(dispatcher.broadcast(&config, "hello").await, 2);
        assert_eq!(discord.texts(), vec!["hello".to_string()]);
    }
}
