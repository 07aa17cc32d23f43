use super::DAY_FORMAT;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of one retention sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<PathBuf>,
    pub kept: usize,
    /// Entries whose name is not a calendar date
    pub skipped: usize,
}

/// Delete every date-named directory under `root` older than `retention_days`.
///
/// Age is counted in whole days from `today`; a directory exactly
/// `retention_days` old is kept. A directory that fails to delete is logged
/// and counted as kept.
pub fn sweep(root: &Path, retention_days: u32, today: NaiveDate) -> io::Result<SweepReport> {
    let mut report = SweepReport::default();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(root = %root.display(), "Archive root missing, nothing to sweep");
            return Ok(report);
        }
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            report.skipped += 1;
            continue;
        }

        let Some(date) = entry
            .file_name()
            .to_str()
            .and_then(|name| NaiveDate::parse_from_str(name, DAY_FORMAT).ok())
        else {
            report.skipped += 1;
            continue;
        };

        let age = (today - date).num_days();
        if age <= i64::from(retention_days) {
            report.kept += 1;
            continue;
        }

        let path = entry.path();
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(dir = %path.display(), age_days = age, "Deleted expired archive day");
                report.deleted.push(path);
            }
            Err(e) => {
                warn!(dir = %path.display(), error = %e, "Failed to delete expired archive day");
                report.kept += 1;
            }
        }
    }

    Ok(report)
}
