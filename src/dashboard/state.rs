use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::archive::Archive;
use crate::config::ConfigStore;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<ConfigStore>,
    pub metrics: Arc<Metrics>,
    pub started_at: NaiveDateTime,
}

impl DashboardState {
    pub fn new(config: Arc<ConfigStore>, metrics: Arc<Metrics>, started_at: NaiveDateTime) -> Self {
        Self {
            config,
            metrics,
            started_at,
        }
    }

    /// Archive under the current configuration's root
    pub fn archive(&self) -> Archive {
        Archive::new(&self.config.snapshot().archive_root)
    }
}
