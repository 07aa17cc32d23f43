use super::keys::SettingKey;
use super::models::Config;
use super::{ConfigError, SettingError, sources, validation};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Live configuration backed by a file
///
/// Readers take an `Arc<Config>` snapshot; `reload` builds a complete
/// replacement and swaps the pointer, so a reader holds either the old or
/// the new value, never a mix.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    live: RwLock<Arc<Config>>,
}

impl ConfigStore {
    /// Load the file (plus environment overrides) and validate it.
    ///
    /// A missing or malformed file is fatal at startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = Self::load(&path)?;
        info!(path = %path.display(), "Configuration loaded");

        Ok(Self {
            path,
            live: RwLock::new(Arc::new(config)),
        })
    }

    fn load(path: &Path) -> Result<Config, ConfigError> {
        let config = sources::load_layered(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration currently in effect.
    pub fn snapshot(&self) -> Arc<Config> {
        match self.live.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Atomically overwrite the backing file. The live value is not touched.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        validation::validate(config)?;
        sources::write_atomic(&self.path, config)
    }

    /// Re-read the file and swap the live value.
    ///
    /// On error the previous value stays in effect.
    pub fn reload(&self) -> Result<Arc<Config>, ConfigError> {
        let fresh = Arc::new(Self::load(&self.path)?);

        match self.live.write() {
            Ok(mut guard) => *guard = Arc::clone(&fresh),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&fresh),
        }

        info!(path = %self.path.display(), "Configuration reloaded");
        Ok(fresh)
    }

    /// Apply one allow-listed setting, persist it and reload.
    ///
    /// The edit is made on the file's own contents (not the in-memory value,
    /// which may include environment overrides). Validation failures leave
    /// both the file and the live value unchanged.
    pub fn set(&self, key: &str, value: &str) -> Result<String, SettingError> {
        let key: SettingKey = key.parse()?;

        let mut document = sources::load_file_only(&self.path)?;
        let applied = key.apply(&mut document, value)?;

        validation::validate(&document).map_err(|e| SettingError::InvalidValue {
            key: key.to_string(),
            value: value.trim().to_string(),
            reason: e.to_string(),
        })?;

        sources::write_atomic(&self.path, &document)?;
        if let Err(e) = self.reload() {
            warn!(error = %e, "Saved setting but reload failed");
            return Err(e.into());
        }

        info!(%key, value = %applied, "Setting applied");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelKind, SchedulePolicy};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (ConfigStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lapsebox.toml");
        fs::write(&path, contents).unwrap();
        (ConfigStore::open(&path).unwrap(), temp_dir)
    }

    #[test]
    fn test_open_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigStore::open(temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_open_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lapsebox.toml");
        fs::write(&path, "capture_interval_secs = 0").unwrap();

        assert!(matches!(
            ConfigStore::open(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_set_then_reload_round_trip() {
        let (store, _temp) = store_with(
            r#"
project_name = "Bridge"
capture_interval_secs = 120

[telegram]
enabled = true
hours = [9]
"#,
        );

        store.set("retention", "30").unwrap();
        let reloaded = store.reload().unwrap();

        assert_eq!(reloaded.retention_days, 30);
        assert_eq!(reloaded.project_name, "Bridge");
        assert_eq!(reloaded.capture_interval_secs, 120);
        assert!(reloaded.telegram.enabled);
        assert_eq!(reloaded.telegram.hours, vec![9]);
    }

    #[test]
    fn test_set_swaps_live_value() {
        let (store, _temp) = store_with("project_name = \"Old\"");
        let before = store.snapshot();

        store.set("name", "New").unwrap();

        assert_eq!(before.project_name, "Old");
        assert_eq!(store.snapshot().project_name, "New");
    }

    #[test]
    fn test_set_unknown_key() {
        let (store, _temp) = store_with("");
        let on_disk = fs::read_to_string(store.path()).unwrap();

        let err = store.set("archive_root", "/tmp").unwrap_err();
        assert!(matches!(err, SettingError::InvalidKey(_)));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), on_disk);
    }

    #[test]
    fn test_set_invalid_value_leaves_store_unchanged() {
        let (store, _temp) = store_with("retention_days = 14");
        let on_disk = fs::read_to_string(store.path()).unwrap();

        let err = store.set("retention", "two weeks").unwrap_err();
        assert!(matches!(err, SettingError::InvalidValue { .. }));
        assert_eq!(store.snapshot().retention_days, 14);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), on_disk);
    }

    #[test]
    fn test_set_rejects_oversized_intervals() {
        let (store, _temp) = store_with("[telegram]\ninterval_minutes = 30");
        let on_disk = fs::read_to_string(store.path()).unwrap();

        for key in ["telegram.interval", "discord.interval", "remote.upload-interval"] {
            let err = store.set(key, "307445734561825861").unwrap_err();
            assert!(matches!(err, SettingError::InvalidValue { .. }), "{key}");
        }
        assert_eq!(fs::read_to_string(store.path()).unwrap(), on_disk);

        let config = store.snapshot();
        assert_eq!(
            config.channel(ChannelKind::Telegram).schedule(),
            Some(SchedulePolicy::Interval(Duration::from_secs(30 * 60)))
        );
        assert_eq!(config.remote.upload_interval(), Duration::from_secs(60 * 60));

        store.set("telegram.interval", "10080").unwrap();
        assert_eq!(store.snapshot().telegram.interval_minutes, 10080);
    }

    #[test]
    fn test_reload_picks_up_external_edit() {
        let (store, _temp) = store_with("project_name = \"Before\"");

        fs::write(store.path(), "project_name = \"After\"\nretention_days = 7").unwrap();
        let reloaded = store.reload().unwrap();

        assert_eq!(reloaded.project_name, "After");
        assert_eq!(reloaded.retention_days, 7);
    }

    #[test]
    fn test_failed_reload_keeps_previous_value() {
        let (store, _temp) = store_with("project_name = \"Stable\"");

        fs::write(store.path(), "project_name = [").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.snapshot().project_name, "Stable");
    }
}
