//! Purchase orders and receiving

use std::sync::Arc;

use shared::{
    validate_purchase_order, NewPurchaseOrder, Procedure, PurchaseOrder, PurchaseOrderLine, RowId,
};
use tracing::info;

use crate::error::AppResult;
use crate::gateway::Gateway;
use crate::store::EntityStore;

pub struct PurchasingService<G: Gateway> {
    store: Arc<EntityStore<G>>,
}

impl<G: Gateway> Clone for PurchasingService<G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<G: Gateway> PurchasingService<G> {
    pub fn new(store: Arc<EntityStore<G>>) -> Self {
        Self { store }
    }

    pub async fn create_purchase_order(&self, order: &NewPurchaseOrder) -> AppResult<PurchaseOrder> {
        validate_purchase_order(order)?;
        let created: PurchaseOrder = self.store.insert(order).await?;
        info!(po_id = created.id, vendor = %created.vendor, "Purchase order created");
        Ok(created)
    }

    /// Receives the order: the backend allocates surcharges, writes landed
    /// costs and ledger entries, and recomputes average costs.
    pub async fn receive_purchase_order(&self, po_id: RowId) -> AppResult<()> {
        self.store
            .invoke_procedure(Procedure::RecordPurchaseReceipt { po_id })
            .await?;
        info!(po_id, "Purchase order received");
        Ok(())
    }

    pub fn lines(&self, po_id: RowId) -> Vec<PurchaseOrderLine> {
        self.store.with_snapshot(|s| {
            s.purchase_order_lines
                .iter()
                .filter(|l| l.purchase_order_id == po_id)
                .cloned()
                .collect()
        })
    }
}
