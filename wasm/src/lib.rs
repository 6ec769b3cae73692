//! WebAssembly module for the Inventory Dashboard
//!
//! Provides browser-side computation for:
//! - Table search, filter, sort and cell rendering
//! - Sort header toggling
//! - Sale form normalization and validation
//! - Inventory and sales KPI figures
//!
//! Every export takes and returns JSON strings. The `*_json` functions hold
//! the logic so it can be tested natively.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    project, render_row, validate_sales_draft, Column, DateRange, InventoryKpis, InventoryOnHand,
    LowStockAlert, Product, Row, SalesOrder, SalesOrderDraft, SalesOrderLine, SalesTotals,
    TableQuery,
};
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("inventory dashboard module loaded"));
}

fn to_js_error(message: String) -> JsValue {
    web_sys::console::error_1(&JsValue::from_str(&message));
    js_sys::Error::new(&message).into()
}

fn parse<T: for<'de> Deserialize<'de>>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Failed to encode result: {}", e))
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Debug, Serialize)]
struct Projection {
    /// Visible rows in display order, raw values
    rows: Vec<Value>,
    /// Rendered text per visible row, one entry per column
    display: Vec<Vec<String>>,
}

pub fn project_table_json(columns: &str, rows: &str, query: &str) -> Result<String, String> {
    let columns: Vec<Column> = parse("columns", columns)?;
    let query: TableQuery = parse("query", query)?;
    let rows: Vec<Value> = parse("rows", rows)?;
    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, v)| Row::from_json(v).ok_or_else(|| format!("Row {} is not an object", i)))
        .collect::<Result<Vec<_>, _>>()?;

    let visible = project(&columns, &rows, &query);
    to_json(&Projection {
        rows: visible.iter().map(|r| r.to_json()).collect(),
        display: visible.iter().map(|r| render_row(&columns, *r)).collect(),
    })
}

pub fn toggle_sort_json(query: &str, key: &str) -> Result<String, String> {
    let mut query: TableQuery = parse("query", query)?;
    query.toggle_sort(key);
    to_json(&query)
}

/// Filter, search and sort rows for a table component
#[wasm_bindgen]
pub fn project_table(columns_json: &str, rows_json: &str, query_json: &str) -> Result<String, JsValue> {
    project_table_json(columns_json, rows_json, query_json).map_err(to_js_error)
}

/// Apply a header click to the sort state
#[wasm_bindgen]
pub fn toggle_sort(query_json: &str, key: &str) -> Result<String, JsValue> {
    toggle_sort_json(query_json, key).map_err(to_js_error)
}

// ============================================================================
// Forms
// ============================================================================

pub fn normalize_sale_draft_json(draft: &str) -> Result<String, String> {
    let draft: SalesOrderDraft = parse("sale draft", draft)?;
    validate_sales_draft(&draft).map_err(|e| e.to_string())?;
    to_json(&draft.normalized())
}

/// Validate a sale form and apply gift pricing
#[wasm_bindgen]
pub fn normalize_sale_draft(draft_json: &str) -> Result<String, JsValue> {
    normalize_sale_draft_json(draft_json).map_err(to_js_error)
}

// ============================================================================
// KPIs
// ============================================================================

pub fn inventory_kpis_json(
    on_hand: &str,
    products: &str,
    low_stock: &str,
    cogs: &str,
) -> Result<String, String> {
    let on_hand: Vec<InventoryOnHand> = parse("on-hand", on_hand)?;
    let products: Vec<Product> = parse("products", products)?;
    let low_stock: Vec<LowStockAlert> = parse("low-stock", low_stock)?;
    let cogs: Decimal = cogs
        .trim()
        .parse()
        .map_err(|e| format!("Invalid COGS amount: {}", e))?;
    to_json(&InventoryKpis::compute(&on_hand, &products, &low_stock, cogs))
}

pub fn sales_totals_json(orders: &str, lines: &str, range: &str) -> Result<String, String> {
    let orders: Vec<SalesOrder> = parse("sales orders", orders)?;
    let lines: Vec<SalesOrderLine> = parse("sales order lines", lines)?;
    let range: DateRange = parse("date range", range)?;
    to_json(&SalesTotals::compute(&orders, &lines, &range))
}

/// Inventory value, turnover and low-stock count
#[wasm_bindgen]
pub fn inventory_kpis(
    on_hand_json: &str,
    products_json: &str,
    low_stock_json: &str,
    cogs: &str,
) -> Result<String, JsValue> {
    inventory_kpis_json(on_hand_json, products_json, low_stock_json, cogs).map_err(to_js_error)
}

/// Revenue and margins, gifts reported separately
#[wasm_bindgen]
pub fn sales_totals(orders_json: &str, lines_json: &str, range_json: &str) -> Result<String, JsValue> {
    sales_totals_json(orders_json, lines_json, range_json).map_err(to_js_error)
}
