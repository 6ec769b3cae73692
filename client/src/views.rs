//! Column sets of the dashboard pages
//!
//! One descriptor list per mirrored table, and a helper that runs the view
//! engine over the matching snapshot collection and renders the result.

use serde::Serialize;
use shared::{project, render_row, Column, FilterOption, Render, Table, TableQuery, TableRow};

use crate::error::{AppError, AppResult};
use crate::store::Snapshot;

const MONEY: Render = Render::Currency { decimals: 2 };
const UNIT_COST: Render = Render::Currency { decimals: 4 };

/// Columns shown for a table's page
pub fn columns(table: Table) -> Vec<Column> {
    match table {
        Table::Products => vec![
            Column::new("sku", "SKU").sortable().filterable(),
            Column::new("name", "Name").sortable().filterable(),
            Column::new("type", "Type").sortable().select(vec![
                FilterOption::new("base", "Base"),
                FilterOption::new("kit", "Kit"),
            ]),
            Column::new("effective_cost", "Cost").sortable().render(MONEY),
            Column::new("reorder_level", "Reorder Level").sortable(),
        ],
        Table::BillOfMaterials => vec![
            Column::new("id", "ID").sortable().render(Render::Id),
            Column::new("kit_product_id", "Kit").sortable().filterable(),
            Column::new("component_product_id", "Component").sortable().filterable(),
            Column::new("quantity", "Quantity").sortable(),
            Column::new("unit_of_measure", "Unit"),
        ],
        Table::PurchaseOrders => vec![
            Column::new("id", "PO #").sortable().render(Render::Id),
            Column::new("vendor", "Vendor").sortable().filterable(),
            Column::new("date", "Date").sortable(),
            Column::new("freight_in", "Freight In").sortable().render(MONEY),
            Column::new("import_duty", "Import Duty").sortable().render(MONEY),
            Column::new("other_charges", "Other Charges").sortable().render(MONEY),
            Column::new("surcharges", "Total Charges").sortable().render(MONEY),
        ],
        Table::PurchaseOrderLines => vec![
            Column::new("purchase_order_id", "PO #").sortable().render(Render::Id),
            Column::new("product_id", "Product").sortable().filterable(),
            Column::new("qty", "Qty").sortable(),
            Column::new("unit_cost", "Unit Cost").sortable().render(UNIT_COST),
            Column::new("landed_unit_cost", "Landed Cost").sortable().render(UNIT_COST),
        ],
        Table::SalesOrders => vec![
            Column::new("id", "Order #").sortable().render(Render::Id),
            Column::new("customer", "Customer").sortable().filterable(),
            Column::new("date", "Date").sortable(),
            Column::new("is_gift", "Gift")
                .select(vec![
                    FilterOption::new("true", "Yes"),
                    FilterOption::new("false", "No"),
                ])
                .render(Render::Flag),
            Column::new("shipping_cost", "Shipping").sortable().render(MONEY),
            Column::new("total_price", "Revenue").sortable().render(MONEY),
            Column::new("total_cogs", "COGS").sortable().render(MONEY),
            Column::new("gross_profit", "Gross Profit").sortable().render(MONEY),
            Column::new("comments", "Comments").render(Render::DashIfEmpty),
        ],
        Table::SalesOrderLines => vec![
            Column::new("sales_order_id", "Order #").sortable().render(Render::Id),
            Column::new("product_id", "Product").sortable().render(Render::Id),
            Column::new("description", "Description").filterable(),
            Column::new("qty", "Qty").sortable(),
            Column::new("unit_price_override", "Unit Price").sortable().render(UNIT_COST),
            Column::new("line_total", "Line Total").sortable().render(MONEY),
        ],
        Table::InventoryTransactions => vec![
            Column::new("date", "Date").sortable(),
            Column::new("product_id", "Product").sortable().filterable(),
            Column::new("change_qty", "Change").sortable(),
            Column::new("txn_type", "Type").sortable().select(vec![
                FilterOption::new("purchase", "Purchase"),
                FilterOption::new("sale", "Sale"),
                FilterOption::new("assembly_in", "Assembly In"),
                FilterOption::new("assembly_out", "Assembly Out"),
                FilterOption::new("adjustment", "Adjustment"),
            ]),
            Column::new("unit_cost", "Unit Cost").sortable().render(UNIT_COST),
            Column::new("reference_id", "Reference").render(Render::Id),
        ],
        Table::InventoryOnHand => vec![
            Column::new("sku", "SKU").sortable().filterable(),
            Column::new("name", "Name").sortable().filterable(),
            Column::new("on_hand", "On Hand").sortable(),
            Column::new("avg_cost", "Avg Cost").sortable().render(UNIT_COST),
            Column::new("reorder_level", "Reorder Level").sortable(),
        ],
        Table::LowStockAlerts => vec![
            Column::new("sku", "SKU").sortable().filterable(),
            Column::new("name", "Product Name").sortable().filterable(),
            Column::new("on_hand", "On Hand").sortable(),
            Column::new("reorder_level", "Reorder Level").sortable(),
            Column::new("shortage", "Shortage").sortable(),
            Column::new("avg_cost", "Avg Cost").sortable().render(UNIT_COST),
        ],
        Table::Notifications => Vec::new(),
    }
}

/// Display-ready projection of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn render_rows<R: TableRow>(columns: &[Column], rows: &[R], query: &TableQuery) -> RenderedTable {
    RenderedTable {
        headers: columns.iter().map(|c| c.label.clone()).collect(),
        rows: project(columns, rows, query)
            .into_iter()
            .map(|row| render_row(columns, row))
            .collect(),
    }
}

/// Runs `query` over the snapshot's rows of `table`
pub fn render(snapshot: &Snapshot, table: Table, query: &TableQuery) -> AppResult<RenderedTable> {
    let columns = columns(table);
    let rendered = match table {
        Table::Products => render_rows(&columns, &snapshot.products, query),
        Table::BillOfMaterials => render_rows(&columns, &snapshot.bill_of_materials, query),
        Table::PurchaseOrders => render_rows(&columns, &snapshot.purchase_orders, query),
        Table::PurchaseOrderLines => render_rows(&columns, &snapshot.purchase_order_lines, query),
        Table::SalesOrders => render_rows(&columns, &snapshot.sales_orders, query),
        Table::SalesOrderLines => render_rows(&columns, &snapshot.sales_order_lines, query),
        Table::InventoryTransactions => {
            render_rows(&columns, &snapshot.inventory_transactions, query)
        }
        Table::InventoryOnHand => render_rows(&columns, &snapshot.inventory_on_hand, query),
        Table::LowStockAlerts => render_rows(&columns, &snapshot.low_stock_alerts, query),
        Table::Notifications => {
            return Err(AppError::Validation {
                field: "table".to_string(),
                message: "notifications are write-only".to_string(),
            })
        }
    };
    Ok(rendered)
}
