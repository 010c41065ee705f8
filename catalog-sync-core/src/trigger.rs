//! Trigger sources for the continuous modes.
//!
//! [`IntervalTrigger`] polls the data file fingerprint on a fixed period;
//! [`WatchTrigger`] reacts to file-system notifications for the data file.
//! Both only decide *when* a batch runs; the batch itself is the same.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::contract::{Trigger, TriggerSource};
use crate::reader::DataFileReader;

/// Delay between a change notification and the batch, so half-written files settle.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Fires when the data file fingerprint differs after an interval sleep.
pub struct IntervalTrigger {
    reader: DataFileReader,
    interval: Duration,
}

impl IntervalTrigger {
    /// The reader's baseline is primed here, so only changes made after
    /// construction fire a trigger.
    pub fn new(mut reader: DataFileReader, interval: Duration) -> Self {
        reader.has_changed();
        info!(
            path = %reader.path().display(),
            interval_secs = interval.as_secs(),
            "Interval trigger armed"
        );
        Self { reader, interval }
    }
}

#[async_trait]
impl TriggerSource for IntervalTrigger {
    async fn next_trigger(&mut self) -> Option<Trigger> {
        loop {
            tokio::time::sleep(self.interval).await;
            if self.reader.has_changed() {
                let fingerprint = self
                    .reader
                    .baseline()
                    .map(|fp| fp.to_string())
                    .unwrap_or_default();
                return Some(Trigger::Interval { fingerprint });
            }
            debug!("No changes detected in data file");
        }
    }
}

/// Fires on modify/create notifications for the data file.
///
/// The parent directory is watched non-recursively so that editors replacing
/// the file by rename are still noticed.
pub struct WatchTrigger {
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<PathBuf>,
    debounce: Duration,
}

impl WatchTrigger {
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Result<Self, notify::Error> {
        let path = path.into();
        let file_name: OsString = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| notify::Error::generic("data file path has no file name"))?;
        let watch_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher =
            notify::recommended_watcher(move |event: notify::Result<notify::Event>| match event {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    for changed in event.paths {
                        if changed.file_name() == Some(file_name.as_os_str()) {
                            // Receiver gone means the trigger was dropped.
                            let _ = tx.send(changed);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "File watcher reported an error"),
            })?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        info!(
            path = %path.display(),
            directory = %watch_dir.display(),
            debounce_ms = debounce.as_millis() as u64,
            "Watching data file for changes"
        );

        Ok(Self {
            _watcher: watcher,
            events: rx,
            debounce,
        })
    }
}

#[async_trait]
impl TriggerSource for WatchTrigger {
    async fn next_trigger(&mut self) -> Option<Trigger> {
        let path = self.events.recv().await?;
        info!(path = %path.display(), "Data file modified");

        tokio::time::sleep(self.debounce).await;

        let mut coalesced = 0usize;
        while self.events.try_recv().is_ok() {
            coalesced += 1;
        }
        if coalesced > 0 {
            debug!(coalesced, "Coalesced further change events into one trigger");
        }
        Some(Trigger::FileEvent { path })
    }
}
