use std::path::Path;

use chrono::NaiveDate;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::commands::CommandCursor;
use crate::config::ChannelKind;

use super::error::Result;
use super::partitions::{STATE_PARTITION, command_cursor_key, last_sweep_key, report_key};

/// Fjall-backed store for the loop state that must survive a restart
#[derive(Clone)]
pub struct StateLedger {
    keyspace: Keyspace,
    state: PartitionHandle,
}

impl StateLedger {
    /// Open or create the ledger at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening state ledger at: {}", path.display());

        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let state = keyspace.open_partition(STATE_PARTITION, PartitionCreateOptions::default())?;

        Ok(Self { keyspace, state })
    }

    fn get<T: DeserializeOwned>(&self, key: Vec<u8>) -> Result<Option<T>> {
        match self.state.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, key: Vec<u8>, value: &T) -> Result<()> {
        let value = serde_json::to_vec(value)?;
        self.state.insert(key, value)?;
        Ok(())
    }

    pub fn command_cursor(&self) -> Result<CommandCursor> {
        Ok(self.get(command_cursor_key())?.unwrap_or_default())
    }

    pub fn save_command_cursor(&self, cursor: CommandCursor) -> Result<()> {
        self.put(command_cursor_key(), &cursor)?;
        debug!(cursor = ?cursor.last(), "Saved command cursor");
        Ok(())
    }

    pub fn last_sweep(&self) -> Result<Option<NaiveDate>> {
        self.get(last_sweep_key())
    }

    pub fn record_sweep(&self, date: NaiveDate) -> Result<()> {
        self.put(last_sweep_key(), &date)
    }

    pub fn last_report(&self, kind: ChannelKind) -> Result<Option<NaiveDate>> {
        self.get(report_key(kind))
    }

    pub fn record_report(&self, kind: ChannelKind, date: NaiveDate) -> Result<()> {
        self.put(report_key(kind), &date)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}
