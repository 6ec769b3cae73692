//! Stock levels, the inventory ledger and low-stock reminders

use std::sync::Arc;

use shared::{
    DateRange, InventoryKpis, InventoryTransaction, LedgerFilter, LowStockAlert,
    LowStockReminder, RowId, SalesTotals, Table,
};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::gateway::{to_fields, Gateway};
use crate::store::EntityStore;

/// Inventory service for stock views, KPIs and alerts
pub struct InventoryService<G: Gateway> {
    store: Arc<EntityStore<G>>,
}

impl<G: Gateway> Clone for InventoryService<G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<G: Gateway> InventoryService<G> {
    pub fn new(store: Arc<EntityStore<G>>) -> Self {
        Self { store }
    }

    pub fn low_stock(&self) -> Vec<LowStockAlert> {
        self.store.rows::<LowStockAlert>()
    }

    pub fn ledger(&self, filter: &LedgerFilter) -> Vec<InventoryTransaction> {
        self.store.with_snapshot(|s| {
            filter
                .apply(&s.inventory_transactions)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Valuation and turnover; COGS comes from paying sales dated in `range`
    pub fn kpis(&self, range: &DateRange) -> InventoryKpis {
        self.store.with_snapshot(|s| {
            let sales = SalesTotals::compute(&s.sales_orders, &s.sales_order_lines, range);
            InventoryKpis::compute(
                &s.inventory_on_hand,
                &s.products,
                &s.low_stock_alerts,
                sales.total_cogs,
            )
        })
    }

    /// Writes a reminder for a product currently on the low-stock list
    pub async fn send_reminder(&self, product_id: RowId) -> AppResult<LowStockReminder> {
        let alert = self
            .store
            .get::<LowStockAlert>(product_id)
            .ok_or(AppError::NotFound {
                table: Table::LowStockAlerts,
                id: product_id,
            })?;
        let reminder = alert.reminder();
        self.store
            .insert_row(Table::Notifications, to_fields(&reminder)?)
            .await?;
        info!(product_id, sku = %alert.sku, "Low-stock reminder sent");
        Ok(reminder)
    }
}
