use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use lapsebox::archive::{Archive, ArchiveDay};
use lapsebox::config::{RemoteConfig, RemoteProvider};
use lapsebox::replication::marker::is_marked;
use lapsebox::replication::{
    ObjectStoreRemote, RemoteError, RemoteSession, RemoteStore, ReplicationError, Replicator,
};

/// Remote that keeps objects in a map and rejects configured file names
#[derive(Default)]
struct FlakyRemote {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    reject: Vec<String>,
    refuse_sessions: bool,
}

struct FlakySession {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    reject: Vec<String>,
}

#[async_trait]
impl RemoteStore for FlakyRemote {
    async fn open_session(
        &self,
        _config: &RemoteConfig,
    ) -> Result<Box<dyn RemoteSession>, RemoteError> {
        if self.refuse_sessions {
            return Err(RemoteError::Connect("connection refused".to_string()));
        }
        Ok(Box::new(FlakySession {
            objects: self.objects.clone(),
            reject: self.reject.clone(),
        }))
    }
}

#[async_trait]
impl RemoteSession for FlakySession {
    async fn ensure_dir(&mut self, _dir: &str) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn put(&mut self, path: &str, data: Bytes) -> Result<(), RemoteError> {
        if self.reject.iter().any(|name| path.ends_with(name.as_str())) {
            return Err(RemoteError::Connect(format!("write of {path} reset")));
        }
        self.objects.lock().unwrap().insert(path.to_string(), data);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), RemoteError> {
        Ok(())
    }
}

fn remote_config() -> RemoteConfig {
    RemoteConfig {
        enabled: true,
        provider: RemoteProvider::Memory,
        ..RemoteConfig::default()
    }
}

fn day_with(temp_dir: &TempDir, names: &[&str]) -> ArchiveDay {
    let archive = Archive::new(temp_dir.path());
    let day = archive
        .ensure_day(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        .unwrap();
    for name in names {
        fs::write(day.path.join(name), b"\xFF\xD8jpeg").unwrap();
    }
    day
}

const A: &str = "snapshot_20240601_100000.jpg";
const B: &str = "snapshot_20240601_100100.jpg";
const C: &str = "snapshot_20240601_100200.jpg";

#[tokio::test]
async fn test_second_pass_uploads_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let day = day_with(&temp_dir, &[A, B, C]);
    let replicator = Replicator::new(Arc::new(ObjectStoreRemote::new()));

    let first = replicator.replicate_day(&remote_config(), &day).await.unwrap();
    let second = replicator.replicate_day(&remote_config(), &day).await.unwrap();

    assert_eq!((first.uploaded, first.skipped, first.failed), (3, 0, 0));
    assert_eq!((second.uploaded, second.skipped, second.failed), (0, 3, 0));
}

#[tokio::test]
async fn test_failed_file_stays_unmarked_and_retries_later() {
    let temp_dir = TempDir::new().unwrap();
    let day = day_with(&temp_dir, &[A, B, C]);
    let objects = Arc::new(Mutex::new(BTreeMap::new()));

    let flaky = FlakyRemote {
        objects: objects.clone(),
        reject: vec![B.to_string()],
        ..FlakyRemote::default()
    };
    let report = Replicator::new(Arc::new(flaky))
        .replicate_day(&remote_config(), &day)
        .await
        .unwrap();

    assert_eq!((report.uploaded, report.failed), (2, 1));
    assert!(!report.is_failure());
    assert_eq!(report.last_error().unwrap().file, B);
    assert!(is_marked(&day.path.join(A)));
    assert!(!is_marked(&day.path.join(B)));
    assert!(is_marked(&day.path.join(C)));

    // the next run only sends what is still unmarked
    let healthy = FlakyRemote {
        objects: objects.clone(),
        ..FlakyRemote::default()
    };
    let retry = Replicator::new(Arc::new(healthy))
        .replicate_day(&remote_config(), &day)
        .await
        .unwrap();

    assert_eq!((retry.uploaded, retry.skipped, retry.failed), (1, 2, 0));
    assert_eq!(objects.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_refused_session_marks_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let day = day_with(&temp_dir, &[A, B]);

    let refusing = FlakyRemote {
        refuse_sessions: true,
        ..FlakyRemote::default()
    };
    let result = Replicator::new(Arc::new(refusing))
        .replicate_day(&remote_config(), &day)
        .await;

    assert!(matches!(result, Err(ReplicationError::Session(_))));
    assert!(!is_marked(&day.path.join(A)));
    assert!(!is_marked(&day.path.join(B)));
}

#[tokio::test]
async fn test_every_file_failing_is_a_failed_run() {
    let temp_dir = TempDir::new().unwrap();
    let day = day_with(&temp_dir, &[A]);

    let flaky = FlakyRemote {
        reject: vec![A.to_string()],
        ..FlakyRemote::default()
    };
    let report = Replicator::new(Arc::new(flaky))
        .replicate_day(&remote_config(), &day)
        .await
        .unwrap();

    assert!(report.is_failure());
}
