//! # contract: data model and seams of the synchroniser
//!
//! This module defines the plain data that flows through a synchronisation run
//! and the two traits the orchestrator is generic over:
//!
//! - [`Catalog`]: the remote commerce catalog (authenticate, look up, create, update).
//! - [`TriggerSource`]: anything that says "run a batch now" (a polling timer, a file watcher).
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, so tests and downstream crates (with the
//! `test-export-mocks` feature) can script catalog responses and trigger sequences.
//!
//! ## Implementors
//! - [`Catalog`]: the HTTP client in the `catalog-sync` binary crate, and `MockCatalog`.
//! - [`TriggerSource`]: [`crate::trigger::IntervalTrigger`], [`crate::trigger::WatchTrigger`], and `MockTriggerSource`.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

use crate::error::CatalogError;

pub const PRODUCT_NUMBER: &str = "product_number";
pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const PRICE: &str = "price";
pub const STOCK: &str = "stock";
pub const WEIGHT: &str = "weight";
pub const EAN: &str = "ean";
pub const ACTIVE: &str = "active";

/// Columns every data file must carry in its header.
pub const REQUIRED_COLUMNS: [&str; 4] = [PRODUCT_NUMBER, NAME, PRICE, STOCK];

/// One data line of the CSV file: column name to cell text, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    /// 1-based line in the file (header = 1, first data row = 2).
    pub line_number: usize,
    fields: Vec<(String, String)>,
}

impl RowRecord {
    pub fn new<K, V>(line_number: usize, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            line_number,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Cell value for `column`. Empty cells read as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.trim().is_empty())
    }

    /// The product number correlating this row with a remote item.
    pub fn business_key(&self) -> Option<&str> {
        self.get(PRODUCT_NUMBER)
    }
}

/// A product as returned by the catalog search endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteItem {
    /// Internal catalog id, used for updates.
    pub id: String,
    #[serde(rename = "productNumber", default)]
    pub product_number: Option<String>,
}

/// One price entry of a product payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub currency_id: String,
    pub gross: f64,
    pub net: f64,
    pub linked: bool,
}

/// Body of a product create or update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub product_number: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Vec<PriceEntry>,
    pub stock: i64,
    pub tax_id: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ean: Option<String>,
}

/// The remote catalog the rows are pushed into.
///
/// Implementors own their session credential; every data call must make sure a
/// credential is held before issuing the request.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Catalog: Send {
    /// Obtain a fresh session credential and keep it for subsequent calls.
    async fn authenticate(&mut self) -> Result<(), CatalogError>;

    /// First remote item whose business key equals `key`, if any.
    async fn find_by_business_key(&mut self, key: &str)
        -> Result<Option<RemoteItem>, CatalogError>;

    /// Create a new item and return its catalog id.
    async fn create(&mut self, payload: &ProductPayload) -> Result<String, CatalogError>;

    /// Partially update the item with catalog id `id`.
    async fn update(&mut self, id: &str, payload: &ProductPayload) -> Result<(), CatalogError>;
}

/// Why a batch is about to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// The polling timer saw a new fingerprint.
    Interval { fingerprint: String },
    /// The file watcher reported a change to the data file.
    FileEvent { path: PathBuf },
}

/// Source of "run a batch now" events for the continuous modes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TriggerSource: Send {
    /// Wait for the next trigger. `None` means the source is closed and no
    /// further triggers will come.
    async fn next_trigger(&mut self) -> Option<Trigger>;
}
