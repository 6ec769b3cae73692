//! Common types used across the dashboard

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Backend-assigned row identifier
pub type RowId = i64;

/// Logical tables and views mirrored by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Products,
    BillOfMaterials,
    PurchaseOrders,
    PurchaseOrderLines,
    SalesOrders,
    SalesOrderLines,
    InventoryTransactions,
    InventoryOnHand,
    LowStockAlerts,
    /// Write-only sink for low-stock reminders
    Notifications,
}

impl Table {
    pub const ALL: [Table; 10] = [
        Table::Products,
        Table::BillOfMaterials,
        Table::PurchaseOrders,
        Table::PurchaseOrderLines,
        Table::SalesOrders,
        Table::SalesOrderLines,
        Table::InventoryTransactions,
        Table::InventoryOnHand,
        Table::LowStockAlerts,
        Table::Notifications,
    ];

    /// Tables fetched by the initial bulk load, in load order
    pub const LOADED: [Table; 9] = [
        Table::Products,
        Table::BillOfMaterials,
        Table::PurchaseOrders,
        Table::PurchaseOrderLines,
        Table::SalesOrders,
        Table::SalesOrderLines,
        Table::InventoryTransactions,
        Table::InventoryOnHand,
        Table::LowStockAlerts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::BillOfMaterials => "bill_of_materials",
            Table::PurchaseOrders => "purchase_orders",
            Table::PurchaseOrderLines => "purchase_order_lines",
            Table::SalesOrders => "sales_orders",
            Table::SalesOrderLines => "sales_order_lines",
            Table::InventoryTransactions => "inventory_transactions",
            Table::InventoryOnHand => "inventory_on_hand",
            Table::LowStockAlerts => "low_stock_alerts",
            Table::Notifications => "notifications",
        }
    }

    /// Remote relation rows are read from. Products come from the cost view.
    pub fn read_relation(&self, prefix: &str) -> Option<String> {
        match self {
            Table::Products => Some(format!("{prefix}products_with_cost")),
            Table::InventoryOnHand | Table::LowStockAlerts => Some(self.as_str().to_string()),
            Table::Notifications => None,
            other => Some(format!("{prefix}{}", other.as_str())),
        }
    }

    /// Remote relation writes go to, if the client may write this table at all
    pub fn write_relation(&self, prefix: &str) -> Option<String> {
        self.is_writable().then(|| format!("{prefix}{}", self.as_str()))
    }

    /// Remote relation whose change stream feeds this table
    pub fn live_relation(&self, prefix: &str) -> Option<String> {
        self.is_live().then(|| format!("{prefix}{}", self.as_str()))
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, Table::Notifications)
    }

    pub fn is_derived_view(&self) -> bool {
        matches!(self, Table::InventoryOnHand | Table::LowStockAlerts)
    }

    /// Base tables kept current by push notifications
    pub fn is_live(&self) -> bool {
        self.is_loaded() && !self.is_derived_view()
    }

    /// The ledger, the purchase order lines and the views are written server-side only.
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            Table::Products
                | Table::BillOfMaterials
                | Table::PurchaseOrders
                | Table::SalesOrders
                | Table::SalesOrderLines
                | Table::Notifications
        )
    }

    /// Changes here alter the computed cost of kits
    pub fn invalidates_product_costs(&self) -> bool {
        matches!(self, Table::Products | Table::BillOfMaterials)
    }

    /// Column that identifies a row of this table
    pub fn key_column(&self) -> &'static str {
        if self.is_derived_view() {
            "product_id"
        } else {
            "id"
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_lowercase();
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("Unknown table: {}", s))
    }
}

/// Kind of a pushed change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A change notification for one row.
///
/// For deletes `record` holds the old row, of which only the key column is
/// guaranteed to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Value,
}

impl ChangeEvent {
    pub fn insert(record: Value) -> Self {
        Self {
            kind: ChangeKind::Insert,
            record,
        }
    }

    pub fn update(record: Value) -> Self {
        Self {
            kind: ChangeKind::Update,
            record,
        }
    }

    pub fn delete(record: Value) -> Self {
        Self {
            kind: ChangeKind::Delete,
            record,
        }
    }

    /// Key of the changed row, if the payload carries one
    pub fn record_id(&self, key_column: &str) -> Option<RowId> {
        self.record.get(key_column).and_then(Value::as_i64)
    }
}

/// Named server-side procedures the dashboard relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Procedure {
    /// Finalize a purchase order receipt (ledger entries, landed cost)
    RecordPurchaseReceipt { po_id: RowId },
    /// Finalize a sale (totals, COGS, ledger entries)
    RecordSale { sale_id: RowId },
}

impl Procedure {
    pub fn name(&self) -> &'static str {
        match self {
            Procedure::RecordPurchaseReceipt { .. } => "record_purchase_receipt",
            Procedure::RecordSale { .. } => "record_sale",
        }
    }

    /// Named arguments as sent to the backend
    pub fn args(&self) -> Value {
        match self {
            Procedure::RecordPurchaseReceipt { po_id } => json!({ "po_id": po_id }),
            Procedure::RecordSale { sale_id } => json!({ "sale_id": sale_id }),
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.args())
    }
}

/// Date range for ledger and KPI queries, bounds inclusive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relations_use_prefix() {
        assert_eq!(
            Table::Products.read_relation("inventory_").as_deref(),
            Some("inventory_products_with_cost")
        );
        assert_eq!(
            Table::Products.write_relation("inventory_").as_deref(),
            Some("inventory_products")
        );
        assert_eq!(
            Table::LowStockAlerts.read_relation("inventory_").as_deref(),
            Some("low_stock_alerts")
        );
        assert_eq!(Table::InventoryOnHand.write_relation("inventory_"), None);
        assert_eq!(Table::Notifications.read_relation("inventory_"), None);
    }

    #[test]
    fn test_live_tables() {
        let live: Vec<Table> = Table::ALL.into_iter().filter(Table::is_live).collect();
        assert_eq!(live.len(), 7);
        assert!(!Table::InventoryOnHand.is_live());
        assert!(!Table::Notifications.is_live());
    }

    #[test]
    fn test_table_from_str() {
        assert_eq!("bill-of-materials".parse::<Table>(), Ok(Table::BillOfMaterials));
        assert_eq!("Sales_Orders".parse::<Table>(), Ok(Table::SalesOrders));
        assert!("customers".parse::<Table>().is_err());
    }

    #[test]
    fn test_procedure_args() {
        let p = Procedure::RecordSale { sale_id: 42 };
        assert_eq!(p.name(), "record_sale");
        assert_eq!(p.args(), json!({ "sale_id": 42 }));
    }

    #[test]
    fn test_change_event_record_id() {
        let e = ChangeEvent::delete(json!({ "id": 7 }));
        assert_eq!(e.record_id("id"), Some(7));
        assert_eq!(e.record_id("product_id"), None);
    }

    #[test]
    fn test_date_range_open_bounds() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        assert!(DateRange::default().contains(d));
        let r = DateRange {
            start: NaiveDate::from_ymd_opt(2025, 7, 16),
            end: None,
        };
        assert!(!r.contains(d));
    }
}
