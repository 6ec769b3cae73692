//! Sales orders and the sale entry draft

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Entity;
use crate::table::{CellValue, TableRow};
use crate::types::{RowId, Table};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: RowId,
    pub customer: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub is_gift: bool,
    /// Zero until `record_sale` has run
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub total_cogs: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SalesOrder {
    pub fn gross_profit(&self) -> Decimal {
        self.total_price - self.total_cogs - self.shipping_cost
    }
}

impl Entity for SalesOrder {
    const TABLE: Table = Table::SalesOrders;

    fn id(&self) -> RowId {
        self.id
    }
}

impl TableRow for SalesOrder {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "customer" => self.customer.as_str().into(),
            "date" => self.date.into(),
            "shipping_cost" => self.shipping_cost.into(),
            "comments" => self.comments.clone().into(),
            "is_gift" => self.is_gift.into(),
            "total_price" => self.total_price.into(),
            "total_cogs" => self.total_cogs.into(),
            "gross_profit" => self.gross_profit().into(),
            _ => CellValue::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub id: RowId,
    pub sales_order_id: RowId,
    /// `None` for free-text lines
    #[serde(default)]
    pub product_id: Option<RowId>,
    #[serde(default)]
    pub description: String,
    pub qty: Decimal,
    #[serde(default)]
    pub unit_price_override: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SalesOrderLine {
    pub fn line_total(&self) -> Decimal {
        self.qty * self.unit_price_override
    }
}

impl Entity for SalesOrderLine {
    const TABLE: Table = Table::SalesOrderLines;

    fn id(&self) -> RowId {
        self.id
    }
}

impl TableRow for SalesOrderLine {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "sales_order_id" => self.sales_order_id.into(),
            "product_id" => self.product_id.into(),
            "description" => self.description.as_str().into(),
            "qty" => self.qty.into(),
            "unit_price_override" => self.unit_price_override.into(),
            "line_total" => self.line_total().into(),
            _ => CellValue::Null,
        }
    }
}

/// Insert payload for a sales order header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewSalesOrder {
    #[validate(length(min = 1, max = 200))]
    pub customer: String,
    pub date: NaiveDate,
    pub shipping_cost: Decimal,
    pub comments: Option<String>,
    pub is_gift: bool,
    pub total_price: Decimal,
    pub total_cogs: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSalesOrderLine {
    pub sales_order_id: RowId,
    pub product_id: Option<RowId>,
    pub description: String,
    pub qty: Decimal,
    pub unit_price_override: Decimal,
}

/// A line as typed into the sale form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLineDraft {
    #[serde(default)]
    pub product_id: Option<RowId>,
    #[serde(default)]
    pub description: String,
    pub qty: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
}

/// The whole sale form before submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderDraft {
    pub customer: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub is_gift: bool,
    #[serde(default)]
    pub lines: Vec<SaleLineDraft>,
}

impl SalesOrderDraft {
    /// Gift orders ship free and carry no line prices
    pub fn normalized(&self) -> Self {
        let mut draft = self.clone();
        if draft.is_gift {
            draft.shipping_cost = Decimal::ZERO;
            for line in &mut draft.lines {
                line.unit_price = Decimal::ZERO;
            }
        }
        draft
    }

    /// Header payload; totals start at zero and are filled in by `record_sale`
    pub fn order_payload(&self) -> NewSalesOrder {
        let draft = self.normalized();
        NewSalesOrder {
            customer: draft.customer,
            date: draft.date,
            shipping_cost: draft.shipping_cost,
            comments: draft.comments,
            is_gift: draft.is_gift,
            total_price: Decimal::ZERO,
            total_cogs: Decimal::ZERO,
        }
    }

    pub fn line_payloads(&self, sales_order_id: RowId) -> Vec<NewSalesOrderLine> {
        self.normalized()
            .lines
            .into_iter()
            .map(|line| NewSalesOrderLine {
                sales_order_id,
                // The form uses 0 for "no product"
                product_id: line.product_id.filter(|id| *id != 0),
                description: line.description,
                qty: line.qty,
                unit_price_override: line.unit_price,
            })
            .collect()
    }
}
