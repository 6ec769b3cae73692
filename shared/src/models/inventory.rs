//! Inventory ledger and stock views

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::table::{CellValue, TableRow};
use crate::types::{RowId, Table};

/// Types of inventory transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    Sale,
    /// Kit produced from components
    AssemblyIn,
    /// Components consumed by an assembly
    AssemblyOut,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::Sale => "sale",
            TransactionType::AssemblyIn => "assembly_in",
            TransactionType::AssemblyOut => "assembly_out",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

/// Ledger entry. Written server-side only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: RowId,
    pub product_id: RowId,
    /// Signed; negative for stock leaving
    pub change_qty: Decimal,
    pub txn_type: TransactionType,
    #[serde(default)]
    pub reference_id: Option<RowId>,
    pub date: NaiveDate,
    #[serde(default)]
    pub unit_cost: Decimal,
}

impl InventoryTransaction {
    pub fn value(&self) -> Decimal {
        self.change_qty * self.unit_cost
    }
}

impl Entity for InventoryTransaction {
    const TABLE: Table = Table::InventoryTransactions;

    fn id(&self) -> RowId {
        self.id
    }
}

impl TableRow for InventoryTransaction {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "product_id" => self.product_id.into(),
            "change_qty" => self.change_qty.into(),
            "txn_type" => self.txn_type.as_str().into(),
            "reference_id" => self.reference_id.into(),
            "date" => self.date.into(),
            "unit_cost" => self.unit_cost.into(),
            "value" => self.value().into(),
            _ => CellValue::Null,
        }
    }
}

/// Current stock per product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryOnHand {
    pub product_id: RowId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub on_hand: Decimal,
    #[serde(default)]
    pub avg_cost: Decimal,
    #[serde(default)]
    pub reorder_level: Decimal,
}

impl Entity for InventoryOnHand {
    const TABLE: Table = Table::InventoryOnHand;

    fn id(&self) -> RowId {
        self.product_id
    }
}

impl TableRow for InventoryOnHand {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "product_id" => self.product_id.into(),
            "sku" => self.sku.as_str().into(),
            "name" => self.name.as_str().into(),
            "on_hand" => self.on_hand.into(),
            "avg_cost" => self.avg_cost.into(),
            "reorder_level" => self.reorder_level.into(),
            _ => CellValue::Null,
        }
    }
}

/// Product whose stock is at or below its reorder level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub product_id: RowId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub on_hand: Decimal,
    #[serde(default)]
    pub avg_cost: Decimal,
    #[serde(default)]
    pub reorder_level: Decimal,
}

impl LowStockAlert {
    pub fn shortage(&self) -> Decimal {
        self.reorder_level - self.on_hand
    }

    pub fn reminder(&self) -> LowStockReminder {
        LowStockReminder {
            product_id: self.product_id,
            on_hand: self.on_hand,
            reorder_level: self.reorder_level,
        }
    }
}

impl Entity for LowStockAlert {
    const TABLE: Table = Table::LowStockAlerts;

    fn id(&self) -> RowId {
        self.product_id
    }
}

impl TableRow for LowStockAlert {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "product_id" => self.product_id.into(),
            "sku" => self.sku.as_str().into(),
            "name" => self.name.as_str().into(),
            "on_hand" => self.on_hand.into(),
            "avg_cost" => self.avg_cost.into(),
            "reorder_level" => self.reorder_level.into(),
            "shortage" => self.shortage().into(),
            _ => CellValue::Null,
        }
    }
}

/// Row written to the notifications table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockReminder {
    pub product_id: RowId,
    pub on_hand: Decimal,
    pub reorder_level: Decimal,
}
