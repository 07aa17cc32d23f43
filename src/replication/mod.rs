//! Remote replication of archive days
//!
//! Replication is idempotent: every artifact acknowledged by the remote store
//! gets an upload marker beside it, and marked artifacts are never sent
//! again. A failed run leaves unmarked files for the next run to pick up.

pub mod marker;
pub mod remote;

pub use remote::{ObjectStoreRemote, RemoteError, RemoteSession, RemoteStore};

use crate::archive::ArchiveDay;
use crate::config::RemoteConfig;
use bytes::Bytes;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("Remote session failed: {0}")]
    Session(#[from] RemoteError),

    #[error("Remote {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Failed to list local artifacts: {0}")]
    Listing(std::io::Error),
}

/// Per-file failure detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of one replication run over an ArchiveDay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationReport {
    pub remote_dir: String,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<FileFailure>,
}

impl ReplicationReport {
    /// Files failed and nothing got through.
    pub fn is_failure(&self) -> bool {
        self.failed > 0 && self.uploaded == 0
    }

    pub fn last_error(&self) -> Option<&FileFailure> {
        self.errors.last()
    }
}

/// Mirrors archive days onto a [`RemoteStore`]
#[derive(Clone)]
pub struct Replicator {
    remote: Arc<dyn RemoteStore>,
}

impl Replicator {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    /// Upload every unmarked artifact of `day`.
    ///
    /// Fails as a whole only when the session cannot be set up; in that case
    /// no artifact is marked. Individual file failures are collected in the
    /// report and do not stop the batch.
    pub async fn replicate_day(
        &self,
        config: &RemoteConfig,
        day: &ArchiveDay,
    ) -> Result<ReplicationReport, ReplicationError> {
        let remote_dir = day.name();
        let mut report = ReplicationReport {
            remote_dir: format!("{}/{}", config.remote_root.trim_end_matches('/'), remote_dir),
            ..ReplicationReport::default()
        };

        let open_timeout = config
            .connect_timeout()
            .saturating_add(config.request_timeout());
        let mut session =
            bounded(open_timeout, "connect", self.remote.open_session(config)).await?;

        let prepared = bounded(
            config.request_timeout(),
            "mkdir",
            session.ensure_dir(&remote_dir),
        )
        .await;
        if let Err(e) = prepared {
            close_quietly(session).await;
            return Err(e);
        }

        let artifacts = match day.artifacts() {
            Ok(artifacts) => artifacts,
            Err(e) => {
                close_quietly(session).await;
                return Err(ReplicationError::Listing(e));
            }
        };

        for artifact in &artifacts {
            let name = file_name(artifact);
            if marker::is_marked(artifact) {
                report.skipped += 1;
                continue;
            }

            match upload_one(session.as_mut(), config, &remote_dir, artifact, &name).await {
                Ok(()) => {
                    report.uploaded += 1;
                    debug!(file = %name, "Replicated artifact");
                }
                Err(error) => {
                    warn!(file = %name, %error, "Failed to replicate artifact");
                    report.failed += 1;
                    report.errors.push(FileFailure { file: name, error });
                }
            }
        }

        close_quietly(session).await;

        info!(
            remote_dir = %report.remote_dir,
            uploaded = report.uploaded,
            skipped = report.skipped,
            failed = report.failed,
            "Replication finished"
        );
        Ok(report)
    }
}

async fn upload_one(
    session: &mut dyn RemoteSession,
    config: &RemoteConfig,
    remote_dir: &str,
    artifact: &Path,
    name: &str,
) -> Result<(), String> {
    let data = tokio::fs::read(artifact).await.map_err(|e| e.to_string())?;

    bounded(
        config.request_timeout(),
        "upload",
        session.put(&format!("{remote_dir}/{name}"), Bytes::from(data)),
    )
    .await
    .map_err(|e| e.to_string())?;

    // only after the store acknowledged the bytes
    marker::mark(artifact).map_err(|e| format!("uploaded but marker not written: {e}"))
}

async fn bounded<T>(
    timeout: Duration,
    operation: &'static str,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, ReplicationError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ReplicationError::Timeout { operation, timeout }),
    }
}

async fn close_quietly(session: Box<dyn RemoteSession>) {
    if let Err(e) = session.close().await {
        debug!(error = %e, "Ignoring error while closing remote session");
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
