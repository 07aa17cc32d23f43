//! Snapshot capture
//!
//! The image itself comes from an external process behind [`CaptureSource`].
//! [`capture_into`] wraps one invocation and decides success the way the
//! archive sees it: the day's artifact count grew and the target file exists.

mod ffmpeg;

pub use ffmpeg::FfmpegCapture;

use crate::archive::ArchiveDay;
use crate::config::{CaptureConfig, Config};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Slack on top of the process timeout before the whole attempt is abandoned
const OUTER_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to start capture process: {0}")]
    Spawn(std::io::Error),

    #[error("capture timed out after {0:?}")]
    Timeout(Duration),

    #[error("capture process exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces one image file at `output`
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn capture(
        &self,
        settings: &CaptureConfig,
        source_uri: &str,
        output: &Path,
    ) -> Result<(), CaptureError>;
}

/// Result of one capture attempt
#[derive(Debug, Clone, Default)]
pub struct CaptureOutcome {
    /// The new artifact, present only on success
    pub artifact: Option<PathBuf>,
    pub error: Option<String>,
}

impl CaptureOutcome {
    pub fn succeeded(&self) -> bool {
        self.artifact.is_some()
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            artifact: None,
            error: Some(error.into()),
        }
    }
}

/// Capture one snapshot into `day`.
///
/// Never returns an error; every failure is folded into the outcome.
pub async fn capture_into(
    source: &dyn CaptureSource,
    config: &Config,
    day: &ArchiveDay,
    at: NaiveDateTime,
) -> CaptureOutcome {
    if let Err(e) = std::fs::create_dir_all(&day.path) {
        return CaptureOutcome::failed(format!("cannot create {}: {e}", day.path.display()));
    }

    let before = day.artifact_count().unwrap_or(0);
    let output = day.next_artifact_path(at);
    let limit = config.capture.timeout().saturating_add(OUTER_TIMEOUT_SLACK);

    let result = tokio::time::timeout(
        limit,
        source.capture(&config.capture, &config.source_uri, &output),
    )
    .await
    .unwrap_or_else(|_| Err(CaptureError::Timeout(limit)));

    let after = day.artifact_count().unwrap_or(before);
    let produced = after > before && output.is_file();

    match (result, produced) {
        (Ok(()), true) => {
            info!(file = %output.display(), count = after, "Snapshot captured");
            CaptureOutcome {
                artifact: Some(output),
                error: None,
            }
        }
        (Ok(()), false) => {
            warn!(file = %output.display(), "Capture reported success but no file appeared");
            CaptureOutcome::failed("capture produced no image")
        }
        (Err(e), _) => {
            // a half-written file from a failed run is not an artifact
            if output.exists() {
                let _ = std::fs::remove_file(&output);
            }
            warn!(error = %e, "Snapshot capture failed");
            CaptureOutcome::failed(e.to_string())
        }
    }
}
