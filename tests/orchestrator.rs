use async_trait::async_trait;
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use lapsebox::alerts::FailureCategory;
use lapsebox::archive::Archive;
use lapsebox::capture::{CaptureError, CaptureSource};
use lapsebox::commands::{CommandCursor, CommandSource, CommandSourceError, InboundCommand};
use lapsebox::config::{
    CaptureConfig, ChannelConfig, ChannelKind, Config, ConfigStore, RemoteConfig,
};
use lapsebox::ledger::StateLedger;
use lapsebox::notify::{ChannelError, ChannelTransport, NotificationDispatcher};
use lapsebox::observability::Metrics;
use lapsebox::orchestrator::Orchestrator;
use lapsebox::replication::{
    ObjectStoreRemote, RemoteError, RemoteSession, RemoteStore, Replicator,
};
use lapsebox::services::Services;

#[derive(Default)]
struct Camera {
    broken: AtomicBool,
}

#[async_trait]
impl CaptureSource for Camera {
    async fn capture(
        &self,
        _settings: &CaptureConfig,
        _source_uri: &str,
        output: &Path,
    ) -> Result<(), CaptureError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(CaptureError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "No route to host".to_string(),
            });
        }
        fs::write(output, b"\xFF\xD8\xFF\xE0jpeg")?;
        Ok(())
    }
}

/// Remote whose sessions are refused while `down` is set
#[derive(Default)]
struct Uplink {
    down: AtomicBool,
}

struct UplinkSession;

#[async_trait]
impl RemoteStore for Uplink {
    async fn open_session(
        &self,
        _config: &RemoteConfig,
    ) -> Result<Box<dyn RemoteSession>, RemoteError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RemoteError::Connect("connection refused".to_string()));
        }
        Ok(Box::new(UplinkSession))
    }
}

#[async_trait]
impl RemoteSession for UplinkSession {
    async fn ensure_dir(&mut self, _dir: &str) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn put(&mut self, _path: &str, _data: Bytes) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[derive(Default)]
struct Inbox {
    items: Mutex<Vec<InboundCommand>>,
}

#[async_trait]
impl CommandSource for Inbox {
    fn reply_channel(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn poll(
        &self,
        _config: &Config,
        cursor: CommandCursor,
    ) -> Result<Vec<InboundCommand>, CommandSourceError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|item| cursor.next_offset().is_none_or(|next| item.id >= next))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct Outbox {
    texts: Mutex<Vec<String>>,
}

#[async_trait]
impl ChannelTransport for Outbox {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send_text(&self, _: &ChannelConfig, text: &str) -> Result<(), ChannelError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_photo(
        &self,
        _: &ChannelConfig,
        _photo: &Path,
        caption: &str,
    ) -> Result<(), ChannelError> {
        self.texts.lock().unwrap().push(caption.to_string());
        Ok(())
    }
}

struct Setup {
    orchestrator: Orchestrator,
    services: Services,
    camera: Arc<Camera>,
    inbox: Arc<Inbox>,
    outbox: Arc<Outbox>,
    _temp: TempDir,
}

fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 15)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

fn setup() -> Setup {
    setup_with("", Arc::new(ObjectStoreRemote::new()))
}

fn setup_with(extra: &str, remote: Arc<dyn RemoteStore>) -> Setup {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("lapsebox.toml");
    fs::write(
        &config_path,
        format!(
            r#"
archive_root = {:?}
capture_interval_secs = 60

[telegram]
enabled = true
bot_token = "123:abc"
chat_id = "42"
daily_report_hour = 3
{}"#,
            temp.path().join("pics").to_string_lossy(),
            extra
        ),
    )
    .unwrap();

    let metrics = Arc::new(Metrics::new());
    let camera = Arc::new(Camera::default());
    let inbox = Arc::new(Inbox::default());
    let outbox = Arc::new(Outbox::default());

    let services = Services::builder()
        .config(Arc::new(ConfigStore::open(&config_path).unwrap()))
        .capture(camera.clone())
        .replicator(Replicator::new(remote))
        .dispatcher(NotificationDispatcher::new(metrics.clone()).with_transport(outbox.clone()))
        .metrics(metrics)
        .build();
    let ledger = StateLedger::open(temp.path().join("state")).unwrap();
    let orchestrator = Orchestrator::new(
        services.clone(),
        Some(inbox.clone()),
        ledger,
        at(12, 0, 0),
    );

    Setup {
        orchestrator,
        services,
        camera,
        inbox,
        outbox,
        _temp: temp,
    }
}

fn artifacts(services: &Services, now: NaiveDateTime) -> Vec<String> {
    let config = services.config.snapshot();
    Archive::new(&config.archive_root)
        .day(now.date())
        .artifacts()
        .unwrap()
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_three_ticks_make_three_distinct_artifacts() {
    let mut s = setup();

    for now in [at(12, 0, 0), at(12, 1, 1), at(12, 2, 2)] {
        let report = s.orchestrator.tick(now).await;
        assert!(report.capture.unwrap().succeeded());
    }

    let names = artifacts(&s.services, at(12, 0, 0));
    assert_eq!(names.len(), 3);
    assert_eq!(names.iter().collect::<BTreeSet<_>>().len(), 3);
}

#[tokio::test]
async fn test_set_is_applied_before_the_same_tick_captures() {
    let mut s = setup();
    s.orchestrator.tick(at(12, 0, 0)).await;

    s.inbox.items.lock().unwrap().push(InboundCommand {
        id: 10,
        sender: "42".to_string(),
        text: Some("/set interval 3600".to_string()),
    });

    // 61s later the old interval would capture; the new one must not
    let report = s.orchestrator.tick(at(12, 1, 1)).await;

    assert_eq!(report.commands.handled, 1);
    assert!(report.commands.config_changed);
    assert_eq!(s.services.config.snapshot().capture_interval_secs, 3600);
    assert!(report.capture.is_none());
    assert_eq!(artifacts(&s.services, at(12, 0, 0)).len(), 1);
}

#[tokio::test]
async fn test_capture_alert_fires_exactly_once() {
    let mut s = setup();
    s.camera.broken.store(true, Ordering::SeqCst);

    let mut fired = Vec::new();
    for minute in 0..10 {
        let report = s.orchestrator.tick(at(12, minute, 0)).await;
        if report.alerts.contains(&FailureCategory::Capture) {
            fired.push(minute);
        }
    }

    assert_eq!(fired, vec![4]);
    let alerts = s
        .outbox
        .texts
        .lock()
        .unwrap()
        .iter()
        .filter(|text| text.contains("Snapshot Error"))
        .count();
    assert_eq!(alerts, 1);
    assert_eq!(s.services.metrics.snapshot().captures_failed, 10);
}

#[tokio::test]
async fn test_foreign_chat_commands_are_skipped_but_consumed() {
    let mut s = setup();
    s.inbox.items.lock().unwrap().push(InboundCommand {
        id: 3,
        sender: "666".to_string(),
        text: Some("/set retention 1".to_string()),
    });

    let first = s.orchestrator.tick(at(12, 0, 0)).await;
    let second = s.orchestrator.tick(at(12, 0, 5)).await;

    assert_eq!(first.commands.ignored, 1);
    assert_eq!(second.commands.fetched, 0);
    assert_eq!(s.services.config.snapshot().retention_days, 60);
}

#[tokio::test]
async fn test_upload_alert_fires_on_third_failed_run() {
    let uplink = Arc::new(Uplink::default());
    uplink.down.store(true, Ordering::SeqCst);
    let mut s = setup_with(
        r#"
[remote]
enabled = true
provider = "memory"
upload_interval_minutes = 1
"#,
        uplink.clone(),
    );

    let mut fired = Vec::new();
    for minute in 1..=8 {
        // one healthy run in the middle resets the streak
        uplink.down.store(minute != 5, Ordering::SeqCst);

        let report = s.orchestrator.tick(at(12, minute, 0)).await;
        let upload = report.upload.expect("upload is due every minute");
        assert_eq!(upload.is_ok(), minute == 5);
        assert_eq!(s.orchestrator.timers().last_upload, Some(at(12, minute, 0)));

        if !report.alerts.is_empty() {
            assert_eq!(report.alerts, vec![FailureCategory::Upload]);
            fired.push(minute);
        }
    }

    assert_eq!(fired, vec![3, 8]);
    let alerts = s
        .outbox
        .texts
        .lock()
        .unwrap()
        .iter()
        .filter(|text| text.contains("Upload Error"))
        .count();
    assert_eq!(alerts, 2);
}
