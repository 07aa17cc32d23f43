//! The scheduling loop
//!
//! One [`Orchestrator::tick`] runs every step in a fixed order: archive day,
//! commands, daily reports, capture, upload, scheduled notifications,
//! retention. Commands go first so a `set` is seen by the timed steps of the
//! same tick. Each step is a barrier: its failures are logged and folded
//! into the [`TickReport`], never returned.

mod timers;

pub use timers::{DailyReportGate, TickTimers};

use crate::alerts::{AlertDecision, FailureCategory, FailureCounter};
use crate::archive::{Archive, SweepReport, sweep};
use crate::capture::{CaptureOutcome, capture_into};
use crate::commands::{CommandProcessor, CommandSource, ProcessSummary};
use crate::config::{ChannelKind, Config};
use crate::ledger::StateLedger;
use crate::notify::{ScheduleBook, messages};
use crate::replication::ReplicationReport;
use crate::services::Services;
use crate::status::DailyReport;
use chrono::{Local, NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Period of the scheduling loop
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// What one tick did
#[derive(Debug, Default)]
pub struct TickReport {
    pub commands: ProcessSummary,
    pub daily_reports: Vec<ChannelKind>,
    pub capture: Option<CaptureOutcome>,
    pub upload: Option<Result<ReplicationReport, String>>,
    pub scheduled: Vec<ChannelKind>,
    pub sweep: Option<SweepReport>,
    pub alerts: Vec<FailureCategory>,
}

pub struct Orchestrator {
    services: Services,
    commands: Option<CommandProcessor>,
    ledger: StateLedger,
    failures: FailureCounter,
    timers: TickTimers,
    reports: BTreeMap<ChannelKind, DailyReportGate>,
    schedule: ScheduleBook,
}

impl Orchestrator {
    /// Build the loop state.
    ///
    /// The upload timer starts at `started_at`, so the first upload runs one
    /// interval after start. The command cursor and last sweep date come
    /// from the ledger.
    pub fn new(
        services: Services,
        source: Option<Arc<dyn CommandSource>>,
        ledger: StateLedger,
        started_at: NaiveDateTime,
    ) -> Self {
        let cursor = ledger.command_cursor().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read command cursor, starting fresh");
            Default::default()
        });
        let last_sweep = ledger.last_sweep().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read last sweep date");
            None
        });
        let failures = FailureCounter::from_config(&services.config.snapshot().alerts);

        Self {
            commands: source.map(|source| CommandProcessor::new(source, cursor)),
            services,
            ledger,
            failures,
            timers: TickTimers {
                last_capture: None,
                last_upload: Some(started_at),
                last_sweep,
            },
            reports: BTreeMap::new(),
            schedule: ScheduleBook::new(started_at),
        }
    }

    pub fn timers(&self) -> &TickTimers {
        &self.timers
    }

    pub fn failures(&self) -> &FailureCounter {
        &self.failures
    }

    /// Announce the start on every ready channel and take the first
    /// snapshot, attaching it when it succeeds.
    pub async fn announce_startup(&mut self, now: NaiveDateTime) -> CaptureOutcome {
        let config = self.services.config.snapshot();
        let dispatcher = &self.services.dispatcher;

        let delivered = dispatcher
            .broadcast(&config, &messages::startup(&config, now))
            .await;
        info!(channels = delivered, "Startup announced");

        let outcome = self.capture(&config, now).await;
        self.timers.last_capture = Some(now);
        if let Some(path) = &outcome.artifact {
            let caption = messages::snapshot_caption("First snapshot on startup", now);
            dispatcher
                .broadcast_with_attachment(&config, path, &caption)
                .await;
        }
        outcome
    }

    /// Run every step once, in order.
    pub async fn tick(&mut self, now: NaiveDateTime) -> TickReport {
        let mut report = TickReport::default();
        let today = now.date();

        let archive = Archive::new(&self.services.config.snapshot().archive_root);
        if let Err(e) = archive.ensure_day(today) {
            error!(root = %archive.root().display(), error = %e, "Failed to create archive day");
        }

        if let Some(processor) = self.commands.as_mut() {
            report.commands = processor.process_pending(&self.services, now).await;
            if report.commands.fetched > 0 {
                if let Err(e) = self.ledger.save_command_cursor(processor.cursor()) {
                    warn!(error = %e, "Failed to save command cursor");
                }
            }
            if report.commands.config_changed {
                debug!("Configuration changed by command, applying from this tick");
            }
        }

        // everything below sees the configuration the commands left behind
        let config = self.services.config.snapshot();
        self.failures.set_thresholds(&config.alerts);

        report.daily_reports = self.daily_reports(&config, now).await;

        if self.timers.capture_due(now, config.capture_interval()) {
            let outcome = self.capture(&config, now).await;
            if self.track(FailureCategory::Capture, outcome.succeeded()) {
                let details = format!(
                    "{} consecutive snapshot failures. Last error: {}",
                    self.failures.consecutive(FailureCategory::Capture),
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                self.alert(&config, FailureCategory::Capture, now, &details)
                    .await;
                report.alerts.push(FailureCategory::Capture);
            }
            self.timers.last_capture = Some(now);
            report.capture = Some(outcome);
        }

        if config.remote.enabled
            && self
                .timers
                .upload_due(now, config.remote.upload_interval())
        {
            let upload = self.upload(&config, now).await;
            let ok = matches!(&upload, Ok(run) if !run.is_failure());
            if self.track(FailureCategory::Upload, ok) {
                let last_error = match &upload {
                    Ok(run) => run
                        .last_error()
                        .map(|failure| format!("{}: {}", failure.file, failure.error))
                        .unwrap_or_else(|| "unknown error".to_string()),
                    Err(e) => e.clone(),
                };
                let details = format!(
                    "{} consecutive upload failures. Last error: {last_error}",
                    self.failures.consecutive(FailureCategory::Upload)
                );
                self.alert(&config, FailureCategory::Upload, now, &details)
                    .await;
                report.alerts.push(FailureCategory::Upload);
            }
            self.timers.last_upload = Some(now);
            report.upload = Some(upload);
        }

        report.scheduled = self
            .services
            .dispatcher
            .dispatch_scheduled(&config, &mut self.schedule, now)
            .await;

        if self.timers.sweep_due(today) {
            report.sweep = self.sweep(&config, now);
            self.timers.last_sweep = Some(today);
            if let Err(e) = self.ledger.record_sweep(today) {
                warn!(error = %e, "Failed to record sweep date");
            }
        }

        if let Err(e) = self.ledger.persist() {
            warn!(error = %e, "Failed to persist state ledger");
        }

        report
    }

    /// Tick every [`TICK_INTERVAL`] until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval = ?TICK_INTERVAL, "Orchestrator started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick(Local::now().naive_local()).await;
                    debug!(
                        captured = report.capture.as_ref().is_some_and(CaptureOutcome::succeeded),
                        commands = report.commands.handled,
                        config_changed = report.commands.config_changed,
                        alerts = report.alerts.len(),
                        "Tick finished"
                    );
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping orchestrator");
                    break;
                }
            }
        }

        if let Err(e) = self.ledger.persist() {
            warn!(error = %e, "Failed to persist state ledger on shutdown");
        }
    }

    async fn capture(&self, config: &Config, now: NaiveDateTime) -> CaptureOutcome {
        let archive = Archive::new(&config.archive_root);
        let day = archive.day(now.date());
        let outcome = capture_into(self.services.capture.as_ref(), config, &day, now).await;
        self.services.metrics.capture(outcome.succeeded());
        outcome
    }

    /// Feed one result into the failure counter; true when an alert is due.
    fn track(&mut self, category: FailureCategory, ok: bool) -> bool {
        if ok {
            self.failures.record_success(category);
            return false;
        }
        let decision = self.failures.record_failure(category);
        debug!(
            %category,
            consecutive = self.failures.consecutive(category),
            "Recorded failure"
        );
        decision == AlertDecision::Fire
    }

    async fn alert(
        &self,
        config: &Config,
        category: FailureCategory,
        now: NaiveDateTime,
        details: &str,
    ) {
        warn!(%category, details, "Failure threshold reached, alerting");
        self.services
            .dispatcher
            .broadcast(config, &messages::alert(category, now, details))
            .await;
    }

    /// Replicate today, after finishing the previous day when the date
    /// rolled over since the last run. Only today's result is returned.
    async fn upload(
        &self,
        config: &Config,
        now: NaiveDateTime,
    ) -> Result<ReplicationReport, String> {
        let archive = Archive::new(&config.archive_root);
        let replicator = &self.services.replicator;

        if let Some(last) = self.timers.last_upload {
            if last.date() < now.date() {
                let previous = archive.day(last.date());
                if previous.exists() {
                    match replicator.replicate_day(&config.remote, &previous).await {
                        Ok(run) => info!(
                            day = %previous.name(),
                            uploaded = run.uploaded,
                            failed = run.failed,
                            "Finished previous day"
                        ),
                        Err(e) => {
                            warn!(day = %previous.name(), error = %e, "Previous day upload failed")
                        }
                    }
                }
            }
        }

        let day = archive.day(now.date());
        match replicator.replicate_day(&config.remote, &day).await {
            Ok(run) => {
                info!(
                    remote_dir = %run.remote_dir,
                    uploaded = run.uploaded,
                    skipped = run.skipped,
                    failed = run.failed,
                    "Upload run finished"
                );
                self.services
                    .metrics
                    .upload_run(!run.is_failure(), run.uploaded);
                Ok(run)
            }
            Err(e) => {
                warn!(error = %e, "Upload run failed");
                self.services.metrics.upload_run(false, 0);
                Err(e.to_string())
            }
        }
    }

    async fn daily_reports(&mut self, config: &Config, now: NaiveDateTime) -> Vec<ChannelKind> {
        let mut sent = Vec::new();
        let today = now.date();
        let Some(yesterday) = today.pred_opt() else {
            return sent;
        };
        let dispatcher = self.services.dispatcher.clone();

        for kind in dispatcher.ready_channels(config) {
            let in_hour = now.hour() == config.channel(kind).daily_report_hour;
            if !self.reports.entry(kind).or_default().poll(in_hour) {
                continue;
            }

            // a restart inside the report hour must not send twice
            let already = self.ledger.last_report(kind).unwrap_or_else(|e| {
                warn!(channel = %kind, error = %e, "Failed to read last report date");
                None
            });
            if already == Some(today) {
                debug!(channel = %kind, "Daily report already sent today");
                continue;
            }

            let report = DailyReport::gather(config, yesterday);
            info!(
                channel = %kind,
                date = %yesterday,
                count = report.stats.count,
                "Sending daily report"
            );
            dispatcher
                .send_message(config, kind, &messages::daily_report(&report))
                .await;
            if let Some(latest) = &report.stats.latest {
                let label = format!("Latest snapshot from {}", yesterday.format("%Y-%m-%d"));
                let caption = messages::latest_caption(&label, report.stats.latest_modified);
                dispatcher
                    .send_message_with_attachment(config, kind, latest, &caption)
                    .await;
            }

            if let Err(e) = self.ledger.record_report(kind, today) {
                warn!(channel = %kind, error = %e, "Failed to record daily report");
            }
            sent.push(kind);
        }

        sent
    }

    fn sweep(&self, config: &Config, now: NaiveDateTime) -> Option<SweepReport> {
        match sweep(&config.archive_root, config.retention_days, now.date()) {
            Ok(swept) => {
                info!(
                    deleted = swept.deleted.len(),
                    kept = swept.kept,
                    retention_days = config.retention_days,
                    "Retention sweep finished"
                );
                Some(swept)
            }
            Err(e) => {
                error!(root = %config.archive_root.display(), error = %e, "Retention sweep failed");
                None
            }
        }
    }
}
