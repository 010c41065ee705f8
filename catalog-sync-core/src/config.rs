use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::REQUIRED_COLUMNS;
use crate::trigger::DEFAULT_DEBOUNCE;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// What the orchestrator needs to know about the data side of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub data_file: PathBuf,
    pub check_interval: Duration,
    pub debounce: Duration,
    pub required_columns: Vec<String>,
}

impl SyncConfig {
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            required_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn trace_loaded(&self) {
        info!(
            data_file = %self.data_file.display(),
            check_interval_secs = self.check_interval.as_secs(),
            required_columns = self.required_columns.len(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
