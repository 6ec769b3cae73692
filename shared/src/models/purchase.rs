//! Purchase orders

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Entity;
use crate::table::{CellValue, TableRow};
use crate::types::{RowId, Table};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: RowId,
    pub vendor: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub freight_in: Decimal,
    #[serde(default)]
    pub import_duty: Decimal,
    #[serde(default)]
    pub other_charges: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    /// Charges allocated across the lines on receipt
    pub fn surcharges(&self) -> Decimal {
        self.freight_in + self.import_duty + self.other_charges
    }
}

impl Entity for PurchaseOrder {
    const TABLE: Table = Table::PurchaseOrders;

    fn id(&self) -> RowId {
        self.id
    }
}

impl TableRow for PurchaseOrder {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "vendor" => self.vendor.as_str().into(),
            "date" => self.date.into(),
            "freight_in" => self.freight_in.into(),
            "import_duty" => self.import_duty.into(),
            "other_charges" => self.other_charges.into(),
            "surcharges" => self.surcharges().into(),
            _ => CellValue::Null,
        }
    }
}

/// Received line with its server-computed landed cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: RowId,
    pub purchase_order_id: RowId,
    pub product_id: RowId,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub freight_alloc: Decimal,
    #[serde(default)]
    pub duty_alloc: Decimal,
    #[serde(default)]
    pub other_alloc: Decimal,
    #[serde(default)]
    pub landed_unit_cost: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for PurchaseOrderLine {
    const TABLE: Table = Table::PurchaseOrderLines;

    fn id(&self) -> RowId {
        self.id
    }
}

impl TableRow for PurchaseOrderLine {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "purchase_order_id" => self.purchase_order_id.into(),
            "product_id" => self.product_id.into(),
            "qty" => self.qty.into(),
            "unit_cost" => self.unit_cost.into(),
            "freight_alloc" => self.freight_alloc.into(),
            "duty_alloc" => self.duty_alloc.into(),
            "other_alloc" => self.other_alloc.into(),
            "landed_unit_cost" => self.landed_unit_cost.into(),
            _ => CellValue::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewPurchaseOrder {
    #[validate(length(min = 1, max = 200))]
    pub vendor: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub freight_in: Decimal,
    #[serde(default)]
    pub import_duty: Decimal,
    #[serde(default)]
    pub other_charges: Decimal,
}
