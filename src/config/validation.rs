use super::models::{ChannelKind, Config, RemoteProvider};
use thiserror::Error;

/// One week; longer cadences are almost certainly typos.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: u64 },

    #[error("{field} contains hour {hour}, expected 0-23")]
    HourOutOfRange { field: String, hour: u32 },

    #[error("source_uri must not be empty")]
    EmptySourceUri,

    #[error("remote provider is s3 but bucket is empty")]
    MissingBucket,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_capture(config)?;
    validate_retention(config)?;
    validate_remote(config)?;
    validate_alerts(config)?;
    for kind in ChannelKind::ALL {
        validate_channel(config, kind)?;
    }
    Ok(())
}

fn validate_capture(config: &Config) -> Result<(), ValidationError> {
    if config.source_uri.trim().is_empty() {
        return Err(ValidationError::EmptySourceUri);
    }
    positive(config.capture_interval_secs, "capture_interval_secs")?;
    positive(config.capture.timeout_secs, "capture.timeout_secs")
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    positive(u64::from(config.retention_days), "retention_days")
}

fn validate_remote(config: &Config) -> Result<(), ValidationError> {
    let remote = &config.remote;
    positive(remote.upload_interval_minutes, "remote.upload_interval_minutes")?;
    at_most(
        remote.upload_interval_minutes,
        MAX_INTERVAL_MINUTES,
        || "remote.upload_interval_minutes".to_string(),
    )?;
    positive(remote.connect_timeout_secs, "remote.connect_timeout_secs")?;
    positive(remote.request_timeout_secs, "remote.request_timeout_secs")?;

    if remote.enabled && remote.provider == RemoteProvider::S3 && remote.bucket.trim().is_empty() {
        return Err(ValidationError::MissingBucket);
    }

    Ok(())
}

fn validate_alerts(config: &Config) -> Result<(), ValidationError> {
    positive(u64::from(config.alerts.capture_threshold), "alerts.capture_threshold")?;
    positive(u64::from(config.alerts.upload_threshold), "alerts.upload_threshold")
}

fn validate_channel(config: &Config, kind: ChannelKind) -> Result<(), ValidationError> {
    let channel = config.channel(kind);

    at_most(channel.interval_minutes, MAX_INTERVAL_MINUTES, || {
        format!("{kind}.interval_minutes")
    })?;
    check_hour(channel.daily_report_hour, || format!("{kind}.daily_report_hour"))?;
    for &hour in &channel.hours {
        check_hour(hour, || format!("{kind}.hours"))?;
    }

    Ok(())
}

fn check_hour(hour: u32, field: impl FnOnce() -> String) -> Result<(), ValidationError> {
    if hour > 23 {
        return Err(ValidationError::HourOutOfRange {
            field: field(),
            hour,
        });
    }
    Ok(())
}

fn at_most(value: u64, max: u64, field: impl FnOnce() -> String) -> Result<(), ValidationError> {
    if value > max {
        return Err(ValidationError::TooLarge {
            field: field(),
            max,
        });
    }
    Ok(())
}

fn positive(value: u64, field: &'static str) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_capture_interval() {
        let mut config = Config::default();
        config.capture_interval_secs = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::NotPositive {
                field: "capture_interval_secs"
            })
        ));
    }

    #[test]
    fn test_zero_retention() {
        let mut config = Config::default();
        config.retention_days = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::NotPositive { .. })
        ));
    }

    #[test]
    fn test_hour_out_of_range() {
        let mut config = Config::default();
        config.discord.hours = vec![7, 24];

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::HourOutOfRange { hour: 24, .. }));
        assert_eq!(err.to_string(), "discord.hours contains hour 24, expected 0-23");
    }

    #[test]
    fn test_daily_report_hour_out_of_range() {
        let mut config = Config::default();
        config.telegram.daily_report_hour = 30;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::HourOutOfRange { hour: 30, .. })
        ));
    }

    #[test]
    fn test_interval_upper_bound() {
        let mut config = Config::default();
        config.telegram.interval_minutes = MAX_INTERVAL_MINUTES;
        config.remote.upload_interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(validate(&config).is_ok());

        config.telegram.interval_minutes = MAX_INTERVAL_MINUTES + 1;
        let err = validate(&config).unwrap_err();
        assert_eq!(err.to_string(), "telegram.interval_minutes must be at most 10080");

        config.telegram.interval_minutes = 0;
        config.remote.upload_interval_minutes = u64::MAX;
        assert!(matches!(validate(&config), Err(ValidationError::TooLarge { .. })));
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut config = Config::default();
        config.remote.enabled = true;
        config.remote.provider = RemoteProvider::S3;
        config.remote.bucket = String::new();

        assert!(matches!(validate(&config), Err(ValidationError::MissingBucket)));
    }
}
