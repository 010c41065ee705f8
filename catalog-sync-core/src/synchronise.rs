//! High-level pipeline: orchestrates read → map → upsert for the product data file.
//!
//! This module provides the top-level orchestration logic for "synchronising" the
//! configured CSV file into a remote catalog. It implements a coordinated pipeline that:
//!   - Validates the setup (data file present, required columns, credentials accepted)
//!   - Reads every row of the data file via [`DataFileReader`]
//!   - Upserts each row into the catalog by business key via [`sync_row`]
//!   - Aggregates a [`SyncReport`] of what succeeded and what failed, row by row.
//!
//! # Major Types
//! - [`SyncManager`]: owns the reader and the catalog client for a run
//! - [`SyncReport`]: per-row outcomes of one batch, with a success/failure tally
//!
//! # Responsibilities
//! - Setup problems abort the run before any write is issued
//! - Row failures are isolated: one bad row never aborts the batch
//! - Rows are processed strictly one after another; there is no cross-row transaction
//! - Nothing is retried; the next trigger re-runs the whole batch
//!
//! # Run Modes
//! - [`SyncManager::run_once`]: validate, one batch
//! - [`SyncManager::run_continuous`]: validate, one batch, then one batch per trigger
//!   from any [`TriggerSource`] until the source closes or shutdown resolves
//!
//! # Navigation
//! - Unit of work: [`sync_row`]
//! - Batch: [`SyncManager::sync_all`]

use std::future::Future;

use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::contract::{Catalog, RowRecord, TriggerSource};
use crate::error::{ReaderError, RowError, SetupError, SyncError};
use crate::payload::to_payload;
use crate::reader::DataFileReader;

/// What happened to a row that made it into the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum RowAction {
    Created { id: String },
    Updated { id: String },
}

/// Result of synchronising one row.
#[derive(Debug)]
pub struct RowOutcome {
    pub line_number: usize,
    pub business_key: Option<String>,
    pub result: Result<RowAction, RowError>,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of one batch over the whole data file.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub rows: Vec<RowOutcome>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// True only when no row failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.rows.iter().filter(|r| !r.is_success())
    }
}

/// Upsert one row: update the item with the same business key if the catalog
/// has one, otherwise create it.
pub async fn sync_row<C>(catalog: &mut C, row: &RowRecord) -> RowOutcome
where
    C: Catalog + ?Sized,
{
    let business_key = row.business_key().map(str::to_string);
    let result = upsert(catalog, row).await;

    match &result {
        Ok(action) => debug!(line = row.line_number, ?action, "[SYNC] Row synchronised"),
        Err(e) => error!(
            line = row.line_number,
            product_number = business_key.as_deref().unwrap_or("<missing>"),
            error = %e,
            "[SYNC][ERROR] Row failed"
        ),
    }

    RowOutcome {
        line_number: row.line_number,
        business_key,
        result,
    }
}

async fn upsert<C>(catalog: &mut C, row: &RowRecord) -> Result<RowAction, RowError>
where
    C: Catalog + ?Sized,
{
    let payload = to_payload(row)?;

    match catalog
        .find_by_business_key(&payload.product_number)
        .await?
    {
        Some(existing) => {
            catalog.update(&existing.id, &payload).await?;
            Ok(RowAction::Updated { id: existing.id })
        }
        None => {
            let id = catalog.create(&payload).await?;
            Ok(RowAction::Created { id })
        }
    }
}

/// Owns the data file reader and the catalog client for a run.
pub struct SyncManager<C> {
    config: SyncConfig,
    reader: DataFileReader,
    catalog: C,
}

impl<C> SyncManager<C>
where
    C: Catalog,
{
    pub fn new(config: SyncConfig, catalog: C) -> Self {
        config.trace_loaded();
        let reader = DataFileReader::new(&config.data_file);
        Self {
            config,
            reader,
            catalog,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn reader(&self) -> &DataFileReader {
        &self.reader
    }

    pub fn into_catalog(self) -> C {
        self.catalog
    }

    /// Check the data file and the credentials before anything is written.
    pub async fn validate_setup(&mut self) -> Result<(), SetupError> {
        info!(data_file = %self.reader.path().display(), "[SYNC] Validating setup");

        if !self.reader.exists() {
            error!(path = %self.reader.path().display(), "[SYNC][ERROR] Data file not found");
            return Err(ReaderError::NotFound(self.reader.path().to_path_buf()).into());
        }

        let required: Vec<&str> = self
            .config
            .required_columns
            .iter()
            .map(String::as_str)
            .collect();
        self.reader.validate_columns(&required)?;

        if let Err(e) = self.catalog.authenticate().await {
            error!(error = %e, "[SYNC][ERROR] Catalog authentication failed");
            return Err(SetupError::Auth(e));
        }

        info!("[SYNC] Setup validated");
        Ok(())
    }

    /// Push every row of the data file to the catalog.
    ///
    /// Fails only when the file cannot be read or holds no rows; row-level
    /// failures are collected in the returned report.
    pub async fn sync_all(&mut self) -> Result<SyncReport, SyncError> {
        info!(data_file = %self.reader.path().display(), "[SYNC] Starting product synchronisation");

        let rows = match self.reader.read_rows() {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "[SYNC][ERROR] Could not read data file");
                return Err(e.into());
            }
        };
        if rows.is_empty() {
            error!(path = %self.reader.path().display(), "[SYNC][ERROR] No rows read from data file");
            return Err(SyncError::NoRows(self.reader.path().to_path_buf()));
        }

        let mut report = SyncReport::default();
        for row in &rows {
            report.rows.push(sync_row(&mut self.catalog, row).await);
        }

        if report.is_success() {
            info!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                total = report.total(),
                "[SYNC] Synchronisation finished"
            );
        } else {
            warn!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                total = report.total(),
                "[SYNC] Synchronisation finished with failures"
            );
        }
        Ok(report)
    }

    /// Validate, then run a single batch.
    pub async fn run_once(&mut self) -> Result<SyncReport, SyncError> {
        info!("[SYNC] Running one-off synchronisation");
        self.validate_setup().await?;
        self.sync_all().await
    }

    /// Validate, run an initial batch, then one batch per trigger.
    ///
    /// Returns the number of batches run once `trigger` closes or `shutdown`
    /// resolves. Shutdown is only observed between batches.
    pub async fn run_continuous<T, F>(
        &mut self,
        mut trigger: T,
        shutdown: F,
    ) -> Result<usize, SyncError>
    where
        T: TriggerSource,
        F: Future<Output = ()>,
    {
        self.validate_setup().await?;
        tokio::pin!(shutdown);

        let mut batches = 0usize;
        self.run_batch().await;
        batches += 1;

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    info!("[SYNC] Shutdown requested, stopping");
                    None
                }
                next = trigger.next_trigger() => {
                    if next.is_none() {
                        info!("[SYNC] Trigger source closed, stopping");
                    }
                    next
                }
            };
            let Some(reason) = next else {
                break;
            };

            info!(trigger = ?reason, "[SYNC] Change detected, starting synchronisation");
            self.run_batch().await;
            batches += 1;
        }

        Ok(batches)
    }

    // Continuous modes log batch errors and wait for the next trigger.
    async fn run_batch(&mut self) {
        if let Err(e) = self.sync_all().await {
            error!(error = %e, "[SYNC][ERROR] Batch failed, waiting for next trigger");
        }
    }
}
