use crate::capture::CaptureSource;
use crate::config::ConfigStore;
use crate::notify::NotificationDispatcher;
use crate::observability::Metrics;
use crate::replication::Replicator;
use std::sync::Arc;

/// Collaborators shared by the orchestrator, the command processor and the CLI
#[derive(Clone, bon::Builder)]
pub struct Services {
    pub config: Arc<ConfigStore>,
    pub capture: Arc<dyn CaptureSource>,
    pub replicator: Replicator,
    pub dispatcher: NotificationDispatcher,
    pub metrics: Arc<Metrics>,
}
