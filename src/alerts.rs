//! Consecutive-failure tracking with one alert per streak
//!
//! Each category walks `Idle -> Failing(n) -> Alerted(n)`; any success drops
//! it back to `Idle`. The alert fires on the transition into `Alerted`, which
//! happens when the count *equals* the threshold, so a streak that keeps
//! failing past the threshold never alerts twice.

use crate::config::AlertConfig;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Capture,
    Upload,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::Capture => f.write_str("capture"),
            FailureCategory::Upload => f.write_str("upload"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    Fire,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "failures", rename_all = "lowercase")]
pub enum Streak {
    #[default]
    Idle,
    Failing(u32),
    Alerted(u32),
}

impl Streak {
    pub fn failures(self) -> u32 {
        match self {
            Streak::Idle => 0,
            Streak::Failing(n) | Streak::Alerted(n) => n,
        }
    }

    fn fail(self, threshold: u32) -> (Streak, AlertDecision) {
        match self {
            Streak::Alerted(n) => (Streak::Alerted(n.saturating_add(1)), AlertDecision::Hold),
            other => {
                let n = other.failures().saturating_add(1);
                if n == threshold {
                    (Streak::Alerted(n), AlertDecision::Fire)
                } else {
                    (Streak::Failing(n), AlertDecision::Hold)
                }
            }
        }
    }
}

/// Consecutive-failure counters for capture and upload
#[derive(Debug, Clone)]
pub struct FailureCounter {
    capture: Streak,
    upload: Streak,
    capture_threshold: u32,
    upload_threshold: u32,
}

impl Default for FailureCounter {
    fn default() -> Self {
        Self::new(5, 3)
    }
}

impl FailureCounter {
    pub fn new(capture_threshold: u32, upload_threshold: u32) -> Self {
        Self {
            capture: Streak::Idle,
            upload: Streak::Idle,
            capture_threshold,
            upload_threshold,
        }
    }

    pub fn from_config(alerts: &AlertConfig) -> Self {
        Self::new(alerts.capture_threshold, alerts.upload_threshold)
    }

    /// Pick up changed thresholds without losing the running streaks.
    pub fn set_thresholds(&mut self, alerts: &AlertConfig) {
        self.capture_threshold = alerts.capture_threshold;
        self.upload_threshold = alerts.upload_threshold;
    }

    pub fn record_success(&mut self, category: FailureCategory) {
        *self.streak_mut(category) = Streak::Idle;
    }

    pub fn record_failure(&mut self, category: FailureCategory) -> AlertDecision {
        let threshold = self.threshold(category);
        let streak = self.streak_mut(category);
        let (next, decision) = streak.fail(threshold);
        *streak = next;
        decision
    }

    pub fn consecutive(&self, category: FailureCategory) -> u32 {
        self.streak(category).failures()
    }

    pub fn streak(&self, category: FailureCategory) -> Streak {
        match category {
            FailureCategory::Capture => self.capture,
            FailureCategory::Upload => self.upload,
        }
    }

    fn threshold(&self, category: FailureCategory) -> u32 {
        match category {
            FailureCategory::Capture => self.capture_threshold,
            FailureCategory::Upload => self.upload_threshold,
        }
    }

    fn streak_mut(&mut self, category: FailureCategory) -> &mut Streak {
        match category {
            FailureCategory::Capture => &mut self.capture,
            FailureCategory::Upload => &mut self.upload,
        }
    }
}
