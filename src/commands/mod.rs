//! Chat command processing
//!
//! Every poll advances the cursor past each fetched item, whether or not it
//! was acted on. Only items from the reply channel's configured chat are
//! executed; everything else is dropped silently. A command never fails
//! past the processor: errors become an error reply.

mod parse;
mod source;

pub use parse::{Command, parse};
pub use source::{CommandCursor, CommandSource, CommandSourceError, InboundCommand};

use crate::archive::Archive;
use crate::capture::capture_into;
use crate::config::{ChannelKind, Config, ConfigError, ConfigFormat, SettingError, render};
use crate::notify::messages;
use crate::replication::ReplicationError;
use crate::services::Services;
use crate::status::StatusSnapshot;
use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Bound on one poll of the command source
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Setting(#[from] SettingError),

    #[error("Reload failed: {0}")]
    Reload(#[from] ConfigError),

    #[error("Failed to render configuration: {0}")]
    Render(ConfigError),

    #[error("Error capturing snapshot: {0}")]
    Capture(String),

    #[error("Upload failed: {0}")]
    Upload(#[from] ReplicationError),

    #[error("Archive error: {0}")]
    Archive(#[from] std::io::Error),
}

/// Something to send back to the command's channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Photo { path: PathBuf, caption: String },
}

/// What one `process_pending` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub fetched: usize,
    pub handled: usize,
    pub ignored: usize,
    pub config_changed: bool,
}

pub struct CommandProcessor {
    source: Arc<dyn CommandSource>,
    cursor: CommandCursor,
}

impl CommandProcessor {
    pub fn new(source: Arc<dyn CommandSource>, cursor: CommandCursor) -> Self {
        Self { source, cursor }
    }

    pub fn cursor(&self) -> CommandCursor {
        self.cursor
    }

    /// Fetch and execute every command after the cursor.
    pub async fn process_pending(
        &mut self,
        services: &Services,
        now: NaiveDateTime,
    ) -> ProcessSummary {
        let mut summary = ProcessSummary::default();
        let config = services.config.snapshot();

        let poll = self.source.poll(&config, self.cursor);
        let polled = match tokio::time::timeout(POLL_TIMEOUT, poll).await {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to poll commands");
                return summary;
            }
            Err(_) => {
                warn!(timeout = ?POLL_TIMEOUT, "Command poll timed out");
                return summary;
            }
        };

        let kind = self.source.reply_channel();
        summary.fetched = polled.len();

        for item in polled {
            self.cursor.advance_past(item.id);

            // re-read per item so a `set` is visible to the next command
            let config = services.config.snapshot();
            let Some(text) = item.text.as_deref().filter(|_| is_allowed(&config, kind, &item))
            else {
                debug!(id = item.id, sender = %item.sender, "Ignoring command");
                summary.ignored += 1;
                continue;
            };

            let command = parse(text);
            info!(id = item.id, ?command, "Received command");

            let replies = match execute(&command, services, &config, kind, now).await {
                Ok(replies) => {
                    if matches!(command, Command::Set { .. } | Command::Reload) {
                        summary.config_changed = true;
                    }
                    replies
                }
                Err(e) => {
                    warn!(?command, error = %e, "Command failed");
                    vec![Reply::Text(messages::error(&e.to_string()))]
                }
            };

            // replies go out under the configuration the command produced
            let config = services.config.snapshot();
            for reply in replies {
                send_reply(services, &config, kind, reply).await;
            }

            services.metrics.command_handled();
            summary.handled += 1;
        }

        summary
    }
}

fn is_allowed(config: &Config, kind: ChannelKind, item: &InboundCommand) -> bool {
    let allowed = config.channel(kind).chat_id.trim();
    !allowed.is_empty() && item.sender == allowed
}

async fn send_reply(services: &Services, config: &Config, kind: ChannelKind, reply: Reply) {
    let dispatcher = &services.dispatcher;
    match reply {
        Reply::Text(text) => {
            dispatcher.send_message(config, kind, &text).await;
        }
        Reply::Photo { path, caption } => {
            dispatcher
                .send_message_with_attachment(config, kind, &path, &caption)
                .await;
        }
    }
}

/// Run one command and build its replies.
pub async fn execute(
    command: &Command,
    services: &Services,
    config: &Config,
    kind: ChannelKind,
    now: NaiveDateTime,
) -> Result<Vec<Reply>, CommandError> {
    let archive = Archive::new(&config.archive_root);

    let replies = match command {
        Command::Status => {
            let snapshot = StatusSnapshot::gather(config, now);
            let mut replies = vec![Reply::Text(messages::status(&snapshot))];
            if let Some(latest) = snapshot.latest() {
                replies.push(Reply::Photo {
                    path: latest.clone(),
                    caption: messages::latest_caption(
                        "Latest snapshot",
                        snapshot.today.latest_modified,
                    ),
                });
            }
            replies
        }
        Command::Photo => {
            let day = archive.ensure_day(now.date())?;
            let outcome = capture_into(services.capture.as_ref(), config, &day, now).await;
            services.metrics.capture(outcome.succeeded());
            match outcome.artifact {
                Some(path) => vec![Reply::Photo {
                    path,
                    caption: messages::snapshot_caption("On-demand snapshot", now),
                }],
                None => {
                    return Err(CommandError::Capture(
                        outcome.error.unwrap_or_else(|| "unknown error".to_string()),
                    ));
                }
            }
        }
        Command::Config => match render(&config.redacted(), ConfigFormat::Toml) {
            Ok(rendered) => vec![Reply::Text(messages::config_dump(&rendered))],
            Err(e) => return Err(CommandError::Render(e)),
        },
        Command::Set { key, value } => {
            let applied = services.config.set(key, value)?;
            vec![Reply::Text(format!(
                "✅ <code>{}</code> = {}",
                messages::escape_html(key),
                messages::escape_html(&applied)
            ))]
        }
        Command::SetUsage => vec![Reply::Text(
            "Usage: <code>set &lt;key&gt; &lt;value&gt;</code>\nSend <code>help</code> for the list of keys."
                .to_string(),
        )],
        Command::Reload => {
            services.config.reload()?;
            vec![Reply::Text("✅ Configuration reloaded".to_string())]
        }
        Command::Upload => {
            if !config.remote.enabled {
                vec![Reply::Text("☁️ Remote upload is disabled".to_string())]
            } else {
                let report = services
                    .replicator
                    .replicate_day(&config.remote, &archive.day(now.date()))
                    .await?;
                services
                    .metrics
                    .upload_run(!report.is_failure(), report.uploaded);
                vec![Reply::Text(messages::upload_summary(&report))]
            }
        }
        Command::Help => vec![Reply::Text(messages::help(config, kind))],
        Command::Unknown(token) => vec![Reply::Text(messages::unknown(token))],
    };

    Ok(replies)
}
