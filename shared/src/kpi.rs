//! Aggregations over mirrored data
//!
//! All costing happens server-side; these are plain sums and ratios over rows
//! the backend has already finalized.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    BomLine, InventoryOnHand, InventoryTransaction, LowStockAlert, Product, SalesOrder,
    SalesOrderLine, TransactionType,
};
use crate::table::{CellValue, TableRow};
use crate::types::{DateRange, RowId};

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    }
}

/// Revenue and margin figures, with gift orders reported separately
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub order_count: usize,
    pub gift_order_count: usize,
    pub total_revenue: Decimal,
    pub total_cogs: Decimal,
    pub total_shipping: Decimal,
    pub gross_margin: Decimal,
    pub gross_margin_pct: Decimal,
    pub total_gift_cogs: Decimal,
    pub total_gift_shipping: Decimal,
    pub net_margin_including_gifts: Decimal,
    pub net_margin_including_gifts_pct: Decimal,
    pub total_units_sold: Decimal,
}

impl SalesTotals {
    /// Totals over the orders dated within `range`. Units count every line of
    /// those orders, gifts included.
    pub fn compute(orders: &[SalesOrder], lines: &[SalesOrderLine], range: &DateRange) -> Self {
        let mut totals = SalesTotals::default();
        let mut in_range: Vec<RowId> = Vec::new();

        for order in orders.iter().filter(|o| range.contains(o.date)) {
            in_range.push(order.id);
            if order.is_gift {
                totals.gift_order_count += 1;
                totals.total_gift_cogs += order.total_cogs;
                totals.total_gift_shipping += order.shipping_cost;
            } else {
                totals.order_count += 1;
                totals.total_revenue += order.total_price;
                totals.total_cogs += order.total_cogs;
                totals.total_shipping += order.shipping_cost;
            }
        }

        totals.total_units_sold = lines
            .iter()
            .filter(|l| in_range.contains(&l.sales_order_id))
            .map(|l| l.qty)
            .sum();

        totals.gross_margin = totals.total_revenue - totals.total_cogs - totals.total_shipping;
        totals.gross_margin_pct = percent(totals.gross_margin, totals.total_revenue);
        totals.net_margin_including_gifts =
            totals.gross_margin - totals.total_gift_cogs - totals.total_gift_shipping;
        totals.net_margin_including_gifts_pct =
            percent(totals.net_margin_including_gifts, totals.total_revenue);
        totals
    }
}

/// Stock valuation figures for the dashboard header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryKpis {
    pub total_inventory_value: Decimal,
    pub inventory_turnover: Decimal,
    pub low_stock_count: usize,
}

impl InventoryKpis {
    /// Values stock at each product's effective cost; products missing from
    /// the catalogue count as zero.
    pub fn compute(
        on_hand: &[InventoryOnHand],
        products: &[Product],
        low_stock: &[LowStockAlert],
        cogs: Decimal,
    ) -> Self {
        let costs: HashMap<RowId, Decimal> =
            products.iter().map(|p| (p.id, p.effective_cost())).collect();

        let total_inventory_value: Decimal = on_hand
            .iter()
            .map(|row| costs.get(&row.product_id).copied().unwrap_or_default() * row.on_hand)
            .sum();

        let inventory_turnover = if total_inventory_value > Decimal::ZERO {
            (cogs / total_inventory_value).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Self {
            total_inventory_value,
            inventory_turnover,
            low_stock_count: low_stock.len(),
        }
    }
}

/// A BOM line joined with its component's cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomCostRow {
    pub id: RowId,
    pub component_product_id: RowId,
    pub component_sku: String,
    pub component_name: String,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub component_cost: Decimal,
    pub line_cost: Decimal,
}

impl TableRow for BomCostRow {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "component_product_id" => self.component_product_id.into(),
            "component_sku" => self.component_sku.as_str().into(),
            "component_name" => self.component_name.as_str().into(),
            "quantity" => self.quantity.into(),
            "unit_of_measure" => self.unit_of_measure.as_str().into(),
            "component_cost" => self.component_cost.into(),
            "line_cost" => self.line_cost.into(),
            _ => CellValue::Null,
        }
    }
}

/// Component rows of one kit, in BOM order
pub fn kit_cost_rows(kit_product_id: RowId, bom: &[BomLine], products: &[Product]) -> Vec<BomCostRow> {
    bom.iter()
        .filter(|line| line.kit_product_id == kit_product_id)
        .map(|line| {
            let component = products.iter().find(|p| p.id == line.component_product_id);
            let component_cost = component.map(Product::effective_cost).unwrap_or_default();
            BomCostRow {
                id: line.id,
                component_product_id: line.component_product_id,
                component_sku: component.map(|p| p.sku.clone()).unwrap_or_default(),
                component_name: component.map(|p| p.name.clone()).unwrap_or_default(),
                quantity: line.quantity,
                unit_of_measure: line.unit_of_measure.clone(),
                component_cost,
                line_cost: component_cost * line.quantity,
            }
        })
        .collect()
}

/// Filter for the inventory ledger page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerFilter {
    #[serde(default)]
    pub range: DateRange,
    #[serde(default)]
    pub product_id: Option<RowId>,
    #[serde(default)]
    pub txn_type: Option<TransactionType>,
}

impl LedgerFilter {
    pub fn matches(&self, txn: &InventoryTransaction) -> bool {
        self.range.contains(txn.date)
            && self.product_id.map_or(true, |id| txn.product_id == id)
            && self.txn_type.map_or(true, |t| txn.txn_type == t)
    }

    pub fn apply<'a>(&self, txns: &'a [InventoryTransaction]) -> Vec<&'a InventoryTransaction> {
        txns.iter().filter(|t| self.matches(t)).collect()
    }
}

/// Splits orders into `(paying, gift)`, keeping input order
pub fn split_by_gift(orders: &[SalesOrder]) -> (Vec<&SalesOrder>, Vec<&SalesOrder>) {
    orders.iter().partition(|o| !o.is_gift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductKind;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn order(id: RowId, date: NaiveDate, gift: bool, price: &str, cogs: &str, ship: &str) -> SalesOrder {
        SalesOrder {
            id,
            customer: format!("C{id}"),
            date,
            shipping_cost: dec(ship),
            comments: None,
            is_gift: gift,
            total_price: dec(price),
            total_cogs: dec(cogs),
            created_at: None,
            updated_at: None,
        }
    }

    fn product(id: RowId, sku: &str, avg: &str, computed: Option<&str>) -> Product {
        Product {
            id,
            sku: sku.into(),
            name: format!("Product {sku}"),
            kind: ProductKind::Base,
            avg_cost: dec(avg),
            computed_cost: computed.map(dec),
            reorder_level: Decimal::ZERO,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_sales_totals_split_gifts() {
        let orders = vec![
            order(1, day(2), false, "100", "40", "10"),
            order(2, day(3), true, "0", "15", "0"),
            order(3, day(20), false, "50", "20", "5"),
        ];
        let lines = vec![SalesOrderLine {
            id: 1,
            sales_order_id: 2,
            product_id: Some(1),
            description: String::new(),
            qty: dec("3"),
            unit_price_override: Decimal::ZERO,
            created_at: None,
        }];
        let totals = SalesTotals::compute(&orders, &lines, &DateRange::new(day(1), day(10)));
        assert_eq!(totals.order_count, 1);
        assert_eq!(totals.gift_order_count, 1);
        assert_eq!(totals.gross_margin, dec("50"));
        assert_eq!(totals.gross_margin_pct, dec("50"));
        assert_eq!(totals.net_margin_including_gifts, dec("35"));
        assert_eq!(totals.total_units_sold, dec("3"));
    }

    #[test]
    fn test_sales_totals_zero_revenue_has_zero_margin_pct() {
        let totals = SalesTotals::compute(&[], &[], &DateRange::default());
        assert_eq!(totals.gross_margin_pct, Decimal::ZERO);
    }

    #[test]
    fn test_inventory_kpis() {
        let products = vec![product(1, "A1", "2.50", Some("2.50")), product(2, "K1", "0", Some("7.50"))];
        let on_hand = vec![
            InventoryOnHand {
                product_id: 1,
                sku: "A1".into(),
                name: "Bolt".into(),
                on_hand: dec("10"),
                avg_cost: dec("2.50"),
                reorder_level: Decimal::ZERO,
            },
            InventoryOnHand {
                product_id: 2,
                sku: "K1".into(),
                name: "Kit".into(),
                on_hand: dec("2"),
                avg_cost: Decimal::ZERO,
                reorder_level: Decimal::ZERO,
            },
        ];
        let kpis = InventoryKpis::compute(&on_hand, &products, &[], dec("80"));
        assert_eq!(kpis.total_inventory_value, dec("40"));
        assert_eq!(kpis.inventory_turnover, dec("2"));
        assert_eq!(kpis.low_stock_count, 0);
    }

    #[test]
    fn test_turnover_is_zero_without_stock_value() {
        let kpis = InventoryKpis::compute(&[], &[], &[], dec("80"));
        assert_eq!(kpis.inventory_turnover, Decimal::ZERO);
    }

    #[test]
    fn test_kit_cost_rows() {
        let products = vec![product(1, "A1", "2.50", None)];
        let bom = vec![
            BomLine {
                id: 10,
                kit_product_id: 2,
                component_product_id: 1,
                quantity: dec("3"),
                unit_of_measure: "each".into(),
                created_at: None,
                updated_at: None,
            },
            BomLine {
                id: 11,
                kit_product_id: 5,
                component_product_id: 1,
                quantity: dec("1"),
                unit_of_measure: "each".into(),
                created_at: None,
                updated_at: None,
            },
        ];
        let rows = kit_cost_rows(2, &bom, &products);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].component_sku, "A1");
        assert_eq!(rows[0].line_cost, dec("7.50"));
    }

    #[test]
    fn test_ledger_filter() {
        let txn = |id, product_id, txn_type, date| InventoryTransaction {
            id,
            product_id,
            change_qty: Decimal::ONE,
            txn_type,
            reference_id: None,
            date,
            unit_cost: Decimal::ONE,
        };
        let txns = vec![
            txn(1, 1, TransactionType::Purchase, day(1)),
            txn(2, 1, TransactionType::Sale, day(5)),
            txn(3, 2, TransactionType::Sale, day(9)),
        ];
        let filter = LedgerFilter {
            range: DateRange::new(day(2), day(31)),
            product_id: None,
            txn_type: Some(TransactionType::Sale),
        };
        let ids: Vec<RowId> = filter.apply(&txns).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(LedgerFilter::default().apply(&txns).len(), 3);
    }

    #[test]
    fn test_split_by_gift() {
        let orders = vec![
            order(1, day(1), true, "0", "1", "0"),
            order(2, day(1), false, "5", "1", "0"),
        ];
        let (paying, gifts) = split_by_gift(&orders);
        assert_eq!(paying[0].id, 2);
        assert_eq!(gifts[0].id, 1);
    }
}
