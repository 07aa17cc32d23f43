//! Point-in-time numbers shown in status replies, reports and templates

use crate::archive::{Archive, DayStats, DiskUsage, disk_usage};
use crate::config::Config;
use crate::humanize::ByteSize;
use crate::notify::template::TemplateContext;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::warn;

/// Share of the expected capture count below which the daily report warns
pub const EXPECTED_RATIO_WARNING: f64 = 0.9;

/// Today's archive and disk state
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub project: String,
    pub at: NaiveDateTime,
    pub today: DayStats,
    pub disk: Option<DiskUsage>,
}

impl StatusSnapshot {
    pub fn gather(config: &Config, now: NaiveDateTime) -> Self {
        let archive = Archive::new(&config.archive_root);
        Self {
            project: config.project_name.clone(),
            at: now,
            today: day_stats(&archive, now.date()),
            disk: disk_usage(&config.archive_root),
        }
    }

    pub fn latest(&self) -> Option<&PathBuf> {
        self.today.latest.as_ref()
    }

    pub fn template_context(&self) -> TemplateContext {
        let mut context = TemplateContext::new();
        context.insert("project", self.project.clone());
        context.insert("count", self.today.count.to_string());
        context.insert("size", ByteSize(self.today.total_bytes).to_string());
        context.insert(
            "free",
            self.disk
                .map(|disk| ByteSize(disk.free).to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        );
        context.insert(
            "free_percent",
            self.disk
                .map(|disk| format!("{:.1}", disk.free_percent()))
                .unwrap_or_else(|| "n/a".to_string()),
        );
        context.insert("date", self.at.format("%Y-%m-%d").to_string());
        context.insert("time", self.at.format("%H:%M:%S").to_string());
        context.insert("datetime", self.at.format("%Y-%m-%d %H:%M:%S").to_string());
        context
    }
}

/// Inputs of the daily report for one finished day
#[derive(Debug, Clone)]
pub struct DailyReport {
    pub project: String,
    pub date: NaiveDate,
    pub stats: DayStats,
    pub expected: u64,
    pub disk: Option<DiskUsage>,
    pub days_archived: usize,
    pub retention_days: u32,
    pub low_disk: ByteSize,
}

impl DailyReport {
    pub fn gather(config: &Config, date: NaiveDate) -> Self {
        let archive = Archive::new(&config.archive_root);
        let days_archived = archive.days().map(|days| days.len()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list archive days");
            0
        });

        Self {
            project: config.project_name.clone(),
            date,
            stats: day_stats(&archive, date),
            expected: 86_400 / config.capture_interval_secs.max(1),
            disk: disk_usage(&config.archive_root),
            days_archived,
            retention_days: config.retention_days,
            low_disk: config.alerts.low_disk,
        }
    }

    pub fn below_expected(&self) -> bool {
        (self.stats.count as f64) < self.expected as f64 * EXPECTED_RATIO_WARNING
    }

    pub fn low_disk(&self) -> bool {
        self.disk.is_some_and(|disk| disk.free < self.low_disk.as_u64())
    }
}

fn day_stats(archive: &Archive, date: NaiveDate) -> DayStats {
    archive.day(date).stats().unwrap_or_else(|e| {
        warn!(date = %date, error = %e, "Failed to read archive day");
        DayStats::default()
    })
}

/// Local wall-clock time of a file timestamp
pub fn local_time(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}
