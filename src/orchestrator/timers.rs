use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;

/// Last-run bookkeeping for the timed steps of a tick
#[derive(Debug, Clone, Default)]
pub struct TickTimers {
    pub last_capture: Option<NaiveDateTime>,
    pub last_upload: Option<NaiveDateTime>,
    pub last_sweep: Option<NaiveDate>,
}

impl TickTimers {
    pub fn capture_due(&self, now: NaiveDateTime, interval: Duration) -> bool {
        elapsed_reaches(self.last_capture, now, interval)
    }

    pub fn upload_due(&self, now: NaiveDateTime, interval: Duration) -> bool {
        elapsed_reaches(self.last_upload, now, interval)
    }

    pub fn sweep_due(&self, today: NaiveDate) -> bool {
        self.last_sweep != Some(today)
    }
}

// A clock that went backwards counts as due, so a wall-clock correction
// cannot stall a step until the clock catches up again.
fn elapsed_reaches(last: Option<NaiveDateTime>, now: NaiveDateTime, interval: Duration) -> bool {
    match last {
        None => true,
        Some(last) => (now - last)
            .to_std()
            .map_or(true, |elapsed| elapsed >= interval),
    }
}

/// Fires once when the report hour is first seen, re-arms outside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReportGate {
    armed: bool,
}

impl Default for DailyReportGate {
    fn default() -> Self {
        Self { armed: true }
    }
}

impl DailyReportGate {
    pub fn poll(&mut self, in_report_hour: bool) -> bool {
        if !in_report_hour {
            self.armed = true;
            return false;
        }
        std::mem::replace(&mut self.armed, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 3)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_capture_due() {
        let mut timers = TickTimers::default();
        let interval = Duration::from_secs(60);
        assert!(timers.capture_due(at(10, 0, 0), interval));

        timers.last_capture = Some(at(10, 0, 0));
        assert!(!timers.capture_due(at(10, 0, 59), interval));
        assert!(timers.capture_due(at(10, 1, 0), interval));
    }

    #[test]
    fn test_clock_going_back_is_due() {
        let timers = TickTimers {
            last_capture: Some(at(10, 0, 0)),
            ..TickTimers::default()
        };
        assert!(timers.capture_due(at(9, 0, 0), Duration::from_secs(60)));
    }

    #[test]
    fn test_daily_gate_fires_once_per_hour_window() {
        let mut gate = DailyReportGate::default();

        assert!(gate.poll(true));
        assert!(!gate.poll(true));
        assert!(!gate.poll(true));
        assert!(!gate.poll(false));
        assert!(gate.poll(true));
    }
}
