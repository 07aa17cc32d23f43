//! Settings that can be changed at runtime through the `set` command
//!
//! Keys are dotted, kebab-case and case-insensitive (`remote.upload-interval`,
//! `telegram.hours`). `_` is accepted in place of `-`.

use super::models::{ChannelKind, Config};
use super::SettingError;
use std::fmt;
use std::str::FromStr;

/// A key from the runtime allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Name,
    Interval,
    Retention,
    SourceUri,
    Remote(RemoteField),
    Channel(ChannelKind, ChannelField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteField {
    Enabled,
    Host,
    User,
    Password,
    Port,
    RemoteRoot,
    UploadInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelField {
    DailyHour,
    Enabled,
    Webhook,
    MessageTemplate,
    Hours,
    Interval,
}

impl RemoteField {
    const ALL: [RemoteField; 7] = [
        RemoteField::Enabled,
        RemoteField::Host,
        RemoteField::User,
        RemoteField::Password,
        RemoteField::Port,
        RemoteField::RemoteRoot,
        RemoteField::UploadInterval,
    ];

    fn name(self) -> &'static str {
        match self {
            RemoteField::Enabled => "enabled",
            RemoteField::Host => "host",
            RemoteField::User => "user",
            RemoteField::Password => "password",
            RemoteField::Port => "port",
            RemoteField::RemoteRoot => "remote-root",
            RemoteField::UploadInterval => "upload-interval",
        }
    }
}

impl ChannelField {
    const ALL: [ChannelField; 6] = [
        ChannelField::DailyHour,
        ChannelField::Enabled,
        ChannelField::Webhook,
        ChannelField::MessageTemplate,
        ChannelField::Hours,
        ChannelField::Interval,
    ];

    fn name(self) -> &'static str {
        match self {
            ChannelField::DailyHour => "daily-hour",
            ChannelField::Enabled => "enabled",
            ChannelField::Webhook => "webhook",
            ChannelField::MessageTemplate => "message-template",
            ChannelField::Hours => "hours",
            ChannelField::Interval => "interval",
        }
    }
}

impl SettingKey {
    /// Every accepted key, in help order.
    pub fn all() -> Vec<SettingKey> {
        let mut keys = vec![
            SettingKey::Name,
            SettingKey::Interval,
            SettingKey::Retention,
            SettingKey::SourceUri,
        ];
        keys.extend(RemoteField::ALL.into_iter().map(SettingKey::Remote));
        for kind in ChannelKind::ALL {
            keys.extend(
                ChannelField::ALL
                    .into_iter()
                    .map(|field| SettingKey::Channel(kind, field)),
            );
        }
        keys
    }

    /// Short description of the value the key expects.
    pub fn value_hint(self) -> &'static str {
        match self {
            SettingKey::Name | SettingKey::SourceUri => "text",
            SettingKey::Interval => "seconds",
            SettingKey::Retention => "days",
            SettingKey::Remote(RemoteField::Enabled) => "on/off",
            SettingKey::Remote(RemoteField::Port) => "port number",
            SettingKey::Remote(RemoteField::UploadInterval) => "minutes",
            SettingKey::Remote(_) => "text",
            SettingKey::Channel(_, ChannelField::DailyHour) => "hour 0-23",
            SettingKey::Channel(_, ChannelField::Enabled) => "on/off",
            SettingKey::Channel(_, ChannelField::Hours) => "hours, e.g. 8,12,18 or none",
            SettingKey::Channel(_, ChannelField::Interval) => "minutes, 0 = use hours",
            SettingKey::Channel(_, _) => "text",
        }
    }

    fn is_secret(self) -> bool {
        matches!(self, SettingKey::Remote(RemoteField::Password))
    }

    /// Convert `raw` by the key's declared type and write it into `config`.
    ///
    /// Returns the value as applied, for echoing back to the user. On error
    /// `config` is left untouched.
    pub fn apply(self, config: &mut Config, raw: &str) -> Result<String, SettingError> {
        let raw = raw.trim();
        let invalid = |reason: String| SettingError::InvalidValue {
            key: self.to_string(),
            value: raw.to_string(),
            reason,
        };

        let applied = match self {
            SettingKey::Name => {
                config.project_name = non_empty(raw).map_err(invalid)?;
                config.project_name.clone()
            }
            SettingKey::Interval => {
                config.capture_interval_secs = parse_positive(raw).map_err(invalid)?;
                config.capture_interval_secs.to_string()
            }
            SettingKey::Retention => {
                config.retention_days = parse_positive(raw).map_err(invalid)?;
                config.retention_days.to_string()
            }
            SettingKey::SourceUri => {
                config.source_uri = non_empty(raw).map_err(invalid)?;
                super::models::redact_uri_password(&config.source_uri)
            }
            SettingKey::Remote(field) => {
                let remote = &mut config.remote;
                match field {
                    RemoteField::Enabled => {
                        remote.enabled = parse_bool(raw).map_err(invalid)?;
                        remote.enabled.to_string()
                    }
                    RemoteField::Host => {
                        remote.host = raw.to_string();
                        remote.host.clone()
                    }
                    RemoteField::User => {
                        remote.user = raw.to_string();
                        remote.user.clone()
                    }
                    RemoteField::Password => {
                        remote.password = raw.to_string();
                        remote.password.clone()
                    }
                    RemoteField::Port => {
                        remote.port = parse_number(raw).map_err(invalid)?;
                        remote.port.to_string()
                    }
                    RemoteField::RemoteRoot => {
                        remote.remote_root = non_empty(raw).map_err(invalid)?;
                        remote.remote_root.clone()
                    }
                    RemoteField::UploadInterval => {
                        remote.upload_interval_minutes = parse_positive(raw).map_err(invalid)?;
                        remote.upload_interval_minutes.to_string()
                    }
                }
            }
            SettingKey::Channel(kind, field) => {
                let channel = config.channel_mut(kind);
                match field {
                    ChannelField::DailyHour => {
                        channel.daily_report_hour = parse_hour(raw).map_err(invalid)?;
                        channel.daily_report_hour.to_string()
                    }
                    ChannelField::Enabled => {
                        channel.enabled = parse_bool(raw).map_err(invalid)?;
                        channel.enabled.to_string()
                    }
                    ChannelField::Webhook => {
                        channel.webhook = raw.to_string();
                        channel.webhook.clone()
                    }
                    ChannelField::MessageTemplate => {
                        channel.message_template = non_empty(raw).map_err(invalid)?;
                        channel.message_template.clone()
                    }
                    ChannelField::Hours => {
                        channel.hours = parse_hours(raw).map_err(invalid)?;
                        render_hours(&channel.hours)
                    }
                    ChannelField::Interval => {
                        channel.interval_minutes = parse_number(raw).map_err(invalid)?;
                        channel.interval_minutes.to_string()
                    }
                }
            }
        };

        Ok(if self.is_secret() {
            "********".to_string()
        } else {
            applied
        })
    }
}

impl FromStr for SettingKey {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let unknown = || SettingError::InvalidKey(s.trim().to_string());

        match normalized.split_once('.') {
            None => match normalized.as_str() {
                "name" => Ok(SettingKey::Name),
                "interval" => Ok(SettingKey::Interval),
                "retention" => Ok(SettingKey::Retention),
                "source-uri" => Ok(SettingKey::SourceUri),
                _ => Err(unknown()),
            },
            Some(("remote", field)) => RemoteField::ALL
                .into_iter()
                .find(|candidate| candidate.name() == field)
                .map(SettingKey::Remote)
                .ok_or_else(unknown),
            Some((channel, field)) => {
                let kind = ChannelKind::from_name(channel).ok_or_else(unknown)?;
                ChannelField::ALL
                    .into_iter()
                    .find(|candidate| candidate.name() == field)
                    .map(|field| SettingKey::Channel(kind, field))
                    .ok_or_else(unknown)
            }
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingKey::Name => f.write_str("name"),
            SettingKey::Interval => f.write_str("interval"),
            SettingKey::Retention => f.write_str("retention"),
            SettingKey::SourceUri => f.write_str("source-uri"),
            SettingKey::Remote(field) => write!(f, "remote.{}", field.name()),
            SettingKey::Channel(kind, field) => write!(f, "{}.{}", kind, field.name()),
        }
    }
}

fn non_empty(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        Err("value must not be empty".to_string())
    } else {
        Ok(raw.to_string())
    }
}

fn parse_number<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| format!("expected an integer ({e})"))
}

fn parse_positive<T>(raw: &str) -> Result<T, String>
where
    T: FromStr + Default + PartialEq,
    T::Err: fmt::Display,
{
    let value = parse_number::<T>(raw)?;
    if value == T::default() {
        return Err("must be greater than zero".to_string());
    }
    Ok(value)
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" | "enable" | "enabled" => Ok(true),
        "false" | "off" | "no" | "0" | "disable" | "disabled" => Ok(false),
        _ => Err("expected on/off".to_string()),
    }
}

fn parse_hour(raw: &str) -> Result<u32, String> {
    let hour = parse_number::<u32>(raw)?;
    if hour > 23 {
        return Err("hour must be between 0 and 23".to_string());
    }
    Ok(hour)
}

/// Comma-separated hours; `none`/`off` or an empty string clears the list.
fn parse_hours(raw: &str) -> Result<Vec<u32>, String> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("off") {
        return Ok(Vec::new());
    }

    let mut hours = raw
        .split(',')
        .map(|part| parse_hour(part.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    hours.sort_unstable();
    hours.dedup();
    Ok(hours)
}

fn render_hours(hours: &[u32]) -> String {
    if hours.is_empty() {
        return "none".to_string();
    }
    hours
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
