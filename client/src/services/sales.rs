//! Sales order entry and reporting

use std::sync::Arc;

use shared::{
    split_by_gift, validate_sales_draft, DateRange, Procedure, RowId, SalesOrder, SalesOrderDraft,
    SalesOrderLine, SalesTotals,
};
use tracing::info;

use super::Steps;
use crate::error::AppResult;
use crate::gateway::Gateway;
use crate::store::EntityStore;

/// Sales service for entering and summarizing sales orders
pub struct SalesService<G: Gateway> {
    store: Arc<EntityStore<G>>,
}

impl<G: Gateway> Clone for SalesService<G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<G: Gateway> SalesService<G> {
    pub fn new(store: Arc<EntityStore<G>>) -> Self {
        Self { store }
    }

    /// Inserts the order with zero totals, then each line, then asks the
    /// backend to record the sale. Gift drafts are normalized first.
    pub async fn create_sale(&self, draft: &SalesOrderDraft) -> AppResult<SalesOrder> {
        validate_sales_draft(draft)?;

        let mut steps = Steps::new("create sale");
        let order: SalesOrder = self
            .store
            .insert(&draft.order_payload())
            .await
            .map_err(|e| steps.fail(e))?;
        steps.done(format!("insert sales_orders {}", order.id));

        for payload in draft.line_payloads(order.id) {
            let line: SalesOrderLine = self
                .store
                .insert(&payload)
                .await
                .map_err(|e| steps.fail(e))?;
            steps.done(format!("insert sales_order_lines {}", line.id));
        }

        self.store
            .invoke_procedure(Procedure::RecordSale { sale_id: order.id })
            .await
            .map_err(|e| steps.fail(e))?;

        info!(sale_id = order.id, gift = order.is_gift, "Sale recorded");
        Ok(self.store.get::<SalesOrder>(order.id).unwrap_or(order))
    }

    /// Re-runs sale recording for an existing order
    pub async fn record_sale(&self, sale_id: RowId) -> AppResult<()> {
        self.store
            .invoke_procedure(Procedure::RecordSale { sale_id })
            .await?;
        Ok(())
    }

    pub fn lines(&self, sale_id: RowId) -> Vec<SalesOrderLine> {
        self.store.with_snapshot(|s| {
            s.sales_order_lines
                .iter()
                .filter(|l| l.sales_order_id == sale_id)
                .cloned()
                .collect()
        })
    }

    /// Paying orders, or gift orders when `gifts` is set
    pub fn orders(&self, gifts: bool) -> Vec<SalesOrder> {
        self.store.with_snapshot(|s| {
            let (paying, gift) = split_by_gift(&s.sales_orders);
            let chosen = if gifts { gift } else { paying };
            chosen.into_iter().cloned().collect()
        })
    }

    pub fn totals(&self, range: &DateRange) -> SalesTotals {
        self.store
            .with_snapshot(|s| SalesTotals::compute(&s.sales_orders, &s.sales_order_lines, range))
    }
}
