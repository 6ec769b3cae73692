//! Domain models for the Inventory Dashboard

mod bom;
mod inventory;
mod product;
mod purchase;
mod sales;

pub use bom::*;
pub use inventory::*;
pub use product::*;
pub use purchase::*;
pub use sales::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::table::TableRow;
use crate::types::{RowId, Table};

/// A record mirrored from one logical table
pub trait Entity: Serialize + DeserializeOwned + TableRow + Clone + Send + Sync + 'static {
    const TABLE: Table;

    /// Value of the table's key column
    fn id(&self) -> RowId;

    /// Replaces `self` with a newer version of the same row
    fn merge_from(&mut self, incoming: Self) {
        *self = incoming;
    }

    fn decode(record: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record)
    }
}
