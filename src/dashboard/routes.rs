use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::Local;
use std::collections::BTreeMap;
use std::fs;
use std::time::SystemTime;

use super::{
    error::DashboardError,
    models::{
        DateEntry, HealthResponse, LatestResponse, PageQuery, SnapshotEntry, SnapshotPage,
        StatusResponse,
    },
    state::DashboardState,
    utils::{paginate, parse_day, validate_file_name},
};
use crate::archive::is_artifact;
use crate::config::ChannelKind;
use crate::replication::marker;
use crate::status::{StatusSnapshot, local_time};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_modified(modified: Option<SystemTime>) -> Option<String> {
    modified.map(|time| local_time(time).format(TIME_FORMAT).to_string())
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Liveness (GET /health)
pub async fn health(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at.format(TIME_FORMAT).to_string(),
    })
}

/// Today's numbers, disk, channel readiness and counters (GET /api/status)
pub async fn status(State(state): State<DashboardState>) -> impl IntoResponse {
    let config = state.config.snapshot();
    let snapshot = StatusSnapshot::gather(&config, Local::now().naive_local());

    let channels = ChannelKind::ALL
        .into_iter()
        .map(|kind| (kind.name().to_string(), kind.is_ready(config.channel(kind))))
        .collect::<BTreeMap<_, _>>();

    Json(StatusResponse {
        project: snapshot.project,
        time: snapshot.at.format(TIME_FORMAT).to_string(),
        capture_interval_secs: config.capture_interval_secs,
        retention_days: config.retention_days,
        today: snapshot.today,
        disk: snapshot.disk,
        remote_enabled: config.remote.enabled,
        channels,
        counters: state.metrics.snapshot(),
    })
}

/// Archive days, newest first (GET /api/dates)
pub async fn dates(
    State(state): State<DashboardState>,
) -> Result<Json<Vec<DateEntry>>, DashboardError> {
    let days = state.archive().days()?;
    let mut entries = Vec::with_capacity(days.len());
    for day in days {
        entries.push(DateEntry {
            date: day.name(),
            count: day.artifact_count()?,
        });
    }
    Ok(Json(entries))
}

/// One page of a day's artifacts (GET /api/snapshots/{date})
pub async fn snapshots(
    State(state): State<DashboardState>,
    Path(date): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<SnapshotPage>, DashboardError> {
    let day = parse_day(&state.archive(), &date)?;
    if !day.exists() {
        return Err(DashboardError::NotFound(format!("date {date}")));
    }

    // newest first, like the days list
    let mut artifacts = day.artifacts()?;
    artifacts.reverse();

    let total = artifacts.len();
    let (page, per_page, start) = paginate(total, query.page, query.per_page);

    let mut entries = Vec::new();
    for path in artifacts.iter().skip(start).take(per_page) {
        let meta = fs::metadata(path)?;
        entries.push(SnapshotEntry {
            name: file_name(path),
            size: meta.len(),
            modified: format_modified(meta.modified().ok()),
            uploaded: marker::is_marked(path),
        });
    }

    Ok(Json(SnapshotPage {
        date: day.name(),
        page,
        per_page,
        total,
        total_pages: total.div_ceil(per_page),
        snapshots: entries,
    }))
}

/// Artifact bytes (GET /api/image/{date}/{file})
pub async fn image(
    State(state): State<DashboardState>,
    Path((date, file)): Path<(String, String)>,
) -> Result<impl IntoResponse, DashboardError> {
    let day = parse_day(&state.archive(), &date)?;
    validate_file_name(&file)?;

    let path = day.path.join(&file);
    if !path.is_file() || !is_artifact(&path) {
        return Err(DashboardError::NotFound(format!("image {date}/{file}")));
    }

    let bytes = tokio::fs::read(&path).await?;
    Ok(([(header::CONTENT_TYPE, mime::IMAGE_JPEG.to_string())], bytes))
}

/// Most recent artifact across all days (GET /api/latest)
pub async fn latest(
    State(state): State<DashboardState>,
) -> Result<Json<LatestResponse>, DashboardError> {
    for day in state.archive().days()? {
        let stats = day.stats()?;
        if let Some(path) = stats.latest {
            let size = fs::metadata(&path)?.len();
            return Ok(Json(LatestResponse {
                date: day.name(),
                name: file_name(&path),
                size,
                modified: format_modified(stats.latest_modified),
            }));
        }
    }
    Err(DashboardError::NotFound("no snapshots yet".to_string()))
}
