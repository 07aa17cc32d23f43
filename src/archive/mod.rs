//! Date-partitioned local archive
//!
//! Layout: `<archive_root>/<YYYY-MM-DD>/snapshot_<YYYYMMDD>_<HHMMSS>.jpg`, with
//! an optional `<artifact>.uploaded` marker beside each replicated artifact.
//! Artifact names sort lexicographically in capture order.

pub mod disk;
pub mod retention;

pub use disk::{DiskUsage, disk_usage};
pub use retention::{SweepReport, sweep};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directory name format of an ArchiveDay
pub const DAY_FORMAT: &str = "%Y-%m-%d";

const ARTIFACT_PREFIX: &str = "snapshot_";
const ARTIFACT_EXTENSION: &str = "jpg";

/// Whether `path` names a captured image (by extension, case-insensitive).
pub fn is_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
}

/// Root of the archive
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn day(&self, date: NaiveDate) -> ArchiveDay {
        ArchiveDay {
            date,
            path: self.root.join(date.format(DAY_FORMAT).to_string()),
        }
    }

    /// Resolve a directory name (as used in URLs and commands) to a day.
    pub fn day_by_name(&self, name: &str) -> Option<ArchiveDay> {
        NaiveDate::parse_from_str(name, DAY_FORMAT)
            .ok()
            .map(|date| self.day(date))
    }

    /// Create the day directory if needed.
    pub fn ensure_day(&self, date: NaiveDate) -> io::Result<ArchiveDay> {
        let day = self.day(date);
        fs::create_dir_all(&day.path)?;
        Ok(day)
    }

    /// Existing day directories, newest first. Non-date entries are ignored.
    pub fn days(&self) -> io::Result<Vec<ArchiveDay>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut days = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(date) = entry
                .file_name()
                .to_str()
                .and_then(|name| NaiveDate::parse_from_str(name, DAY_FORMAT).ok())
            {
                days.push(ArchiveDay {
                    date,
                    path: entry.path(),
                });
            }
        }

        days.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(days)
    }
}

/// One date-named directory of artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDay {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Aggregate numbers for one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayStats {
    pub count: usize,
    pub total_bytes: u64,
    pub latest: Option<PathBuf>,
    #[serde(skip)]
    pub latest_modified: Option<SystemTime>,
}

impl ArchiveDay {
    pub fn name(&self) -> String {
        self.date.format(DAY_FORMAT).to_string()
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Artifacts in lexicographic (= chronological) order.
    ///
    /// A missing directory is an empty day.
    pub fn artifacts(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && is_artifact(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn artifact_count(&self) -> io::Result<usize> {
        Ok(self.artifacts()?.len())
    }

    pub fn stats(&self) -> io::Result<DayStats> {
        let artifacts = self.artifacts()?;
        let mut stats = DayStats {
            count: artifacts.len(),
            ..DayStats::default()
        };

        for path in &artifacts {
            let meta = fs::metadata(path)?;
            stats.total_bytes += meta.len();
        }

        if let Some(latest) = artifacts.last() {
            stats.latest_modified = fs::metadata(latest).and_then(|m| m.modified()).ok();
            stats.latest = Some(latest.clone());
        }

        Ok(stats)
    }

    /// Path for an artifact captured at `at`.
    ///
    /// A second capture within the same second gets a `_N` suffix, so an
    /// existing artifact is never overwritten.
    pub fn next_artifact_path(&self, at: NaiveDateTime) -> PathBuf {
        let stem = format!("{ARTIFACT_PREFIX}{}", at.format("%Y%m%d_%H%M%S"));
        let candidate = self.path.join(format!("{stem}.{ARTIFACT_EXTENSION}"));
        if !candidate.exists() {
            return candidate;
        }

        (1u32..)
            .map(|n| self.path.join(format!("{stem}_{n}.{ARTIFACT_EXTENSION}")))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}
