//! Observability: tracing setup and runtime counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the built-in default (`lapsebox=info`, or `debug`
/// with `verbose`). Calling it twice is harmless.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "lapsebox=debug,tower_http=debug"
    } else {
        "lapsebox=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    captures_ok: AtomicU64,
    captures_failed: AtomicU64,
    uploads_ok: AtomicU64,
    uploads_failed: AtomicU64,
    files_uploaded: AtomicU64,
    commands_handled: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&self, ok: bool) {
        if ok {
            bump(&self.captures_ok, "captures_ok");
        } else {
            bump(&self.captures_failed, "captures_failed");
        }
    }

    pub fn upload_run(&self, ok: bool, files: usize) {
        if ok {
            bump(&self.uploads_ok, "uploads_ok");
        } else {
            bump(&self.uploads_failed, "uploads_failed");
        }
        self.files_uploaded.fetch_add(files as u64, Ordering::Relaxed);
    }

    pub fn command_handled(&self) {
        bump(&self.commands_handled, "commands_handled");
    }

    pub fn notification(&self, delivered: bool) {
        if delivered {
            bump(&self.notifications_sent, "notifications_sent");
        } else {
            bump(&self.notifications_failed, "notifications_failed");
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            captures_ok: self.captures_ok.load(Ordering::Relaxed),
            captures_failed: self.captures_failed.load(Ordering::Relaxed),
            uploads_ok: self.uploads_ok.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            files_uploaded: self.files_uploaded.load(Ordering::Relaxed),
            commands_handled: self.commands_handled.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64, name: &'static str) {
    counter.fetch_add(1, Ordering::Relaxed);
    tracing::trace!(counter = name, "Metric incremented");
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub captures_ok: u64,
    pub captures_failed: u64,
    pub uploads_ok: u64,
    pub uploads_failed: u64,
    pub files_uploaded: u64,
    pub commands_handled: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}
