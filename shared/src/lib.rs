//! Shared types and models for the Inventory Dashboard
//!
//! This crate contains the domain records, the logical table catalogue, the
//! tabular view engine and the KPI aggregations shared between the client
//! core, the `invdash` CLI and the browser front-end (via WASM).

pub mod kpi;
pub mod models;
pub mod table;
pub mod types;
pub mod validation;

pub use kpi::*;
pub use models::*;
pub use table::*;
pub use types::*;
pub use validation::*;
