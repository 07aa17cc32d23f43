//! Request validation helpers

use std::path::Path;

use crate::archive::{Archive, ArchiveDay, is_artifact};

use super::error::DashboardError;

pub const DEFAULT_PER_PAGE: usize = 50;
pub const MAX_PER_PAGE: usize = 500;

/// Resolve a `YYYY-MM-DD` path segment to an ArchiveDay
pub fn parse_day(archive: &Archive, date: &str) -> Result<ArchiveDay, DashboardError> {
    archive
        .day_by_name(date)
        .ok_or_else(|| DashboardError::InvalidRequest(format!("invalid date: {date}")))
}

/// Accept only a bare artifact file name.
///
/// Rejects separators and parent components so a request can never leave
/// the day directory.
pub fn validate_file_name(name: &str) -> Result<(), DashboardError> {
    let plain = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && !name.contains("..");
    if !plain || !is_artifact(Path::new(name)) {
        return Err(DashboardError::InvalidRequest(format!(
            "invalid file name: {name}"
        )));
    }
    Ok(())
}

/// `(page, per_page, start)` for a 1-based page request, clamped to range
pub fn paginate(
    total: usize,
    page: Option<usize>,
    per_page: Option<usize>,
) -> (usize, usize, usize) {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let last_page = total.div_ceil(per_page).max(1);
    let page = page.unwrap_or(1).clamp(1, last_page);
    (page, per_page, (page - 1) * per_page)
}
