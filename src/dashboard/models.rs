//! JSON bodies of the dashboard routes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::archive::{DayStats, DiskUsage};
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub started_at: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub project: String,
    pub time: String,
    pub capture_interval_secs: u64,
    pub retention_days: u32,
    pub today: DayStats,
    pub disk: Option<DiskUsage>,
    pub remote_enabled: bool,
    /// Channel name to readiness
    pub channels: BTreeMap<String, bool>,
    pub counters: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct DateEntry {
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub size: u64,
    pub modified: Option<String>,
    pub uploaded: bool,
}

#[derive(Debug, Serialize)]
pub struct SnapshotPage {
    pub date: String,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub snapshots: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub date: String,
    pub name: String,
    pub size: u64,
    pub modified: Option<String>,
}
