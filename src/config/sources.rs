use super::ConfigError;
use super::models::Config;
use config::{Environment, File};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "LAPSEBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/lapsebox.toml";
const ENV_PREFIX: &str = "LAPSEBOX";
const ENV_SEPARATOR: &str = "__";

/// On-disk document format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Pick the configuration file: explicit path, then `LAPSEBOX_CONFIG`, then the default.
pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration with priority (highest first):
/// 1. System environment variables (`LAPSEBOX__<SECTION>__<KEY>`)
/// 2. The configuration file
/// 3. Defaults embedded in the structs
///
/// Unlike a plain settings layer the file is mandatory: a missing file is a
/// startup error.
pub fn load_layered(path: &Path) -> Result<Config, ConfigError> {
    ensure_exists(path)?;
    tracing::debug!("Loading configuration from: {}", path.display());

    let config = config::Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Load the file alone, without environment overrides.
///
/// This is the base for edits that get written back, so values injected
/// through the environment never end up persisted.
pub fn load_file_only(path: &Path) -> Result<Config, ConfigError> {
    ensure_exists(path)?;

    let config = config::Config::builder()
        .add_source(File::from(path).required(true))
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Serialize `config` and replace the file at `path` in one rename.
pub fn write_atomic(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let rendered = render(config, ConfigFormat::for_path(path))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
    staged.write_all(rendered.as_bytes())?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .map_err(|e| ConfigError::Io(e.error))?;

    tracing::info!(path = %path.display(), "Configuration saved");
    Ok(())
}

/// Render a configuration document in the given format.
pub fn render(config: &Config, format: ConfigFormat) -> Result<String, ConfigError> {
    Ok(match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    })
}

fn ensure_exists(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::Missing(path.to_path_buf()))
    }
}
