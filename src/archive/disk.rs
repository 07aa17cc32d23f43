use serde::Serialize;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Space on the filesystem that holds the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub free: u64,
    pub total: u64,
}

impl DiskUsage {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }

    pub fn free_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.free as f64 / self.total as f64 * 100.0
    }

    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 - self.free_percent()
    }
}

/// Usage of the disk whose mount point is the longest prefix of `path`.
///
/// `None` when no mounted disk contains the path (or disks cannot be listed).
pub fn disk_usage(path: &Path) -> Option<DiskUsage> {
    let path = absolute(path);
    let disks = Disks::new_with_refreshed_list();

    disks
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| DiskUsage {
            free: disk.available_space(),
            total: disk.total_space(),
        })
}

// The archive may not exist yet, so fall back to the nearest existing ancestor.
fn absolute(path: &Path) -> PathBuf {
    let mut candidate = path;
    loop {
        if let Ok(resolved) = candidate.canonicalize() {
            return resolved;
        }
        match candidate.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => candidate = parent,
            _ => break,
        }
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
