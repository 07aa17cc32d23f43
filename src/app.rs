//! Wiring for the CLI commands

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{error, info};

use lapsebox::archive::{Archive, sweep};
use lapsebox::capture::FfmpegCapture;
use lapsebox::commands::CommandSource;
use lapsebox::config::{ChannelKind, ConfigFormat, ConfigStore, render};
use lapsebox::dashboard::{self, DashboardState, shutdown_signal};
use lapsebox::ledger::StateLedger;
use lapsebox::notify::{HttpConfig, NotificationDispatcher, TelegramApi, build_client, messages};
use lapsebox::observability::Metrics;
use lapsebox::orchestrator::Orchestrator;
use lapsebox::replication::{ObjectStoreRemote, Replicator};
use lapsebox::services::Services;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn open_config(path: &Path) -> Result<Arc<ConfigStore>, AnyError> {
    info!(path = %path.display(), "Loading configuration");
    let store = ConfigStore::open(path)
        .map_err(|e| format!("Failed to load configuration from {}: {e}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_services(config: Arc<ConfigStore>) -> Result<(Services, reqwest::Client), AnyError> {
    let metrics = Arc::new(Metrics::new());
    let client = build_client(&HttpConfig::default())?;

    let services = Services::builder()
        .config(config)
        .capture(Arc::new(FfmpegCapture::new()))
        .replicator(Replicator::new(Arc::new(ObjectStoreRemote::new())))
        .dispatcher(NotificationDispatcher::with_http_transports(
            metrics.clone(),
            client.clone(),
        ))
        .metrics(metrics)
        .build();

    Ok((services, client))
}

pub async fn run(path: &Path) -> Result<(), AnyError> {
    let config = open_config(path)?;
    let snapshot = config.snapshot();

    let ledger = StateLedger::open(&snapshot.state_dir)
        .map_err(|e| format!("Failed to open state ledger: {e}"))?;
    let (services, client) = build_services(config.clone())?;
    let started_at = Local::now().naive_local();

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let dashboard = snapshot.dashboard.enabled.then(|| {
        let address = snapshot.dashboard.bind_addr;
        let state = DashboardState::new(config.clone(), services.metrics.clone(), started_at);
        let mut stop_rx = stop_rx.clone();
        tokio::spawn(async move {
            let stopped = async move {
                let _ = stop_rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = dashboard::serve(address, state, stopped).await {
                error!(%address, error = %e, "Dashboard failed");
            }
        })
    });

    let source: Arc<dyn CommandSource> = Arc::new(TelegramApi::new(client));
    let mut orchestrator = Orchestrator::new(services, Some(source), ledger, started_at);

    info!(project = %snapshot.project_name, "Starting");
    orchestrator.announce_startup(started_at).await;
    orchestrator.run(shutdown_signal()).await;

    let _ = stop_tx.send(true);
    if let Some(handle) = dashboard {
        let _ = handle.await;
    }

    info!("Stopped");
    Ok(())
}

pub fn check_config(path: &Path) -> Result<(), AnyError> {
    let config = open_config(path)?.snapshot();
    let rendered = render(&config.redacted(), ConfigFormat::for_path(path))?;

    println!("# {} (valid)", path.display());
    println!("{rendered}");
    Ok(())
}

pub async fn test_notify(path: &Path) -> Result<(), AnyError> {
    let store = open_config(path)?;
    let (services, _) = build_services(store)?;
    let config = services.config.snapshot();
    let text = messages::test_message(&config, Local::now().naive_local());

    let mut delivered = 0;
    for kind in ChannelKind::ALL {
        if !services.dispatcher.is_ready(&config, kind) {
            println!("{kind}: not configured");
            continue;
        }
        if services.dispatcher.send_message(&config, kind, &text).await {
            delivered += 1;
            println!("{kind}: delivered");
        } else {
            println!("{kind}: failed");
        }
    }

    if delivered == 0 {
        return Err("no channel delivered the test message".into());
    }
    Ok(())
}

pub fn sweep_once(path: &Path) -> Result<(), AnyError> {
    let config = open_config(path)?.snapshot();
    let today = Local::now().date_naive();

    let report = sweep(&config.archive_root, config.retention_days, today)?;
    for day in &report.deleted {
        println!("deleted {}", day.display());
    }
    println!(
        "{} deleted, {} kept, {} skipped (retention {} days)",
        report.deleted.len(),
        report.kept,
        report.skipped,
        config.retention_days
    );
    Ok(())
}

pub async fn upload_once(path: &Path, date: Option<NaiveDate>) -> Result<(), AnyError> {
    let store = open_config(path)?;
    let (services, _) = build_services(store)?;
    let config = services.config.snapshot();

    if !config.remote.enabled {
        return Err("remote replication is disabled (remote.enabled = false)".into());
    }

    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let day = Archive::new(&config.archive_root).day(date);
    if !day.exists() {
        return Err(format!("no archive day at {}", day.path.display()).into());
    }

    let report = services.replicator.replicate_day(&config.remote, &day).await?;
    println!(
        "{}: {} uploaded, {} already uploaded, {} failed",
        report.remote_dir, report.uploaded, report.skipped, report.failed
    );
    for failure in &report.errors {
        println!("  {}: {}", failure.file, failure.error);
    }

    if report.is_failure() {
        return Err("every upload attempt failed".into());
    }
    Ok(())
}
