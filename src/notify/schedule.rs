//! Per-channel scheduled-notification state

use crate::config::{ChannelKind, SchedulePolicy};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, BTreeSet};

/// Schedule state of one channel
///
/// Hour policy: each listed hour fires at most once per calendar date; the
/// fired set is cleared on the first poll of a new date (hour 0 when the
/// loop runs continuously). Interval policy: fires when the time since the
/// last send reaches the interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleState {
    day: Option<NaiveDate>,
    fired_hours: BTreeSet<u32>,
    last_sent: Option<NaiveDateTime>,
}

impl ScheduleState {
    /// State whose interval clock starts at `at`.
    pub fn seeded(at: NaiveDateTime) -> Self {
        Self {
            last_sent: Some(at),
            ..Self::default()
        }
    }

    /// Whether a notification is due at `now`; a `true` result counts as sent.
    pub fn poll(&mut self, policy: &SchedulePolicy, now: NaiveDateTime) -> bool {
        match policy {
            SchedulePolicy::Hours(hours) => self.poll_hours(hours, now),
            SchedulePolicy::Interval(interval) => {
                let Some(last) = self.last_sent else {
                    self.last_sent = Some(now);
                    return false;
                };
                // a clock that went backwards counts as due, like the tick timers
                let due = (now - last)
                    .to_std()
                    .map_or(true, |elapsed| elapsed >= *interval);
                if due {
                    self.last_sent = Some(now);
                }
                due
            }
        }
    }

    fn poll_hours(&mut self, hours: &BTreeSet<u32>, now: NaiveDateTime) -> bool {
        let today = now.date();
        if self.day != Some(today) {
            self.fired_hours.clear();
            self.day = Some(today);
        }

        let hour = now.hour();
        hours.contains(&hour) && self.fired_hours.insert(hour)
    }

    pub fn fired_hours(&self) -> &BTreeSet<u32> {
        &self.fired_hours
    }
}

/// Schedule state for every channel
#[derive(Debug, Clone)]
pub struct ScheduleBook {
    started_at: NaiveDateTime,
    states: BTreeMap<ChannelKind, ScheduleState>,
}

impl ScheduleBook {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            started_at,
            states: BTreeMap::new(),
        }
    }

    pub fn poll(&mut self, kind: ChannelKind, policy: &SchedulePolicy, now: NaiveDateTime) -> bool {
        let started_at = self.started_at;
        self.states
            .entry(kind)
            .or_insert_with(|| ScheduleState::seeded(started_at))
            .poll(policy, now)
    }
}
