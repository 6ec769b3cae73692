//! Inventory Dashboard client core
//!
//! Mirrors the backend's inventory tables in memory, keeps them current from
//! change notifications, and sequences the dashboard's multi-step writes.
//!
//! Typical wiring:
//! 1. Build a [`gateway::Gateway`] and an [`store::EntityStore`] around it
//! 2. `load_all()` once
//! 3. Start a [`reconciler::Reconciler`] on a change feed, if there is one
//! 4. Read snapshots and write through the services

pub mod config;
pub mod error;
pub mod gateway;
pub mod merge;
pub mod reconciler;
pub mod services;
pub mod store;
pub mod views;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use reconciler::{LiveSync, Reconciler};
pub use store::{EntityStore, Snapshot, Stored};
