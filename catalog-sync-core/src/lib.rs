#![doc = "catalog-sync-core: core logic library for catalog-sync."]

//! This crate contains the data model, the catalog contract, the CSV reader and the
//! synchronisation pipeline. Concrete HTTP clients and configuration loading live in
//! the `catalog-sync` binary crate.
//!
//! # Usage
//! Build a [`synchronise::SyncManager`] from a [`config::SyncConfig`] and any
//! [`contract::Catalog`] implementation, then run it once or on a
//! [`contract::TriggerSource`].

pub mod config;
pub mod contract;
pub mod error;
pub mod payload;
pub mod reader;
pub mod synchronise;
pub mod trigger;
