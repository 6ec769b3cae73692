//! Entity Store
//!
//! Holds the client-side mirror of every loaded table and view, and is the
//! only path through which the dashboard writes to the backend. The lock is
//! synchronous and never held across a gateway call.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use shared::{
    BomLine, ChangeEvent, Entity, InventoryOnHand, InventoryTransaction, LowStockAlert, Procedure,
    Product, PurchaseOrder, PurchaseOrderLine, RowId, SalesOrder, SalesOrderLine, Table,
};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::gateway::{to_fields, Gateway};
use crate::merge;

/// Every mirrored collection, in backend order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub products: Vec<Product>,
    pub bill_of_materials: Vec<BomLine>,
    pub purchase_orders: Vec<PurchaseOrder>,
    pub purchase_order_lines: Vec<PurchaseOrderLine>,
    pub sales_orders: Vec<SalesOrder>,
    pub sales_order_lines: Vec<SalesOrderLine>,
    pub inventory_transactions: Vec<InventoryTransaction>,
    pub inventory_on_hand: Vec<InventoryOnHand>,
    pub low_stock_alerts: Vec<LowStockAlert>,
}

impl Snapshot {
    /// Routes a change to the collection of `table`. Tables that are not
    /// mirrored are ignored.
    pub fn apply(&mut self, table: Table, event: &ChangeEvent) -> AppResult<bool> {
        match table {
            Table::Products => merge::apply_event(&mut self.products, event),
            Table::BillOfMaterials => merge::apply_event(&mut self.bill_of_materials, event),
            Table::PurchaseOrders => merge::apply_event(&mut self.purchase_orders, event),
            Table::PurchaseOrderLines => merge::apply_event(&mut self.purchase_order_lines, event),
            Table::SalesOrders => merge::apply_event(&mut self.sales_orders, event),
            Table::SalesOrderLines => merge::apply_event(&mut self.sales_order_lines, event),
            Table::InventoryTransactions => {
                merge::apply_event(&mut self.inventory_transactions, event)
            }
            Table::InventoryOnHand => merge::apply_event(&mut self.inventory_on_hand, event),
            Table::LowStockAlerts => merge::apply_event(&mut self.low_stock_alerts, event),
            Table::Notifications => Ok(false),
        }
    }

    pub fn len(&self, table: Table) -> usize {
        match table {
            Table::Products => self.products.len(),
            Table::BillOfMaterials => self.bill_of_materials.len(),
            Table::PurchaseOrders => self.purchase_orders.len(),
            Table::PurchaseOrderLines => self.purchase_order_lines.len(),
            Table::SalesOrders => self.sales_orders.len(),
            Table::SalesOrderLines => self.sales_order_lines.len(),
            Table::InventoryTransactions => self.inventory_transactions.len(),
            Table::InventoryOnHand => self.inventory_on_hand.len(),
            Table::LowStockAlerts => self.low_stock_alerts.len(),
            Table::Notifications => 0,
        }
    }
}

/// Entities with a collection in the [`Snapshot`]
pub trait Stored: Entity {
    fn rows(snapshot: &Snapshot) -> &Vec<Self>;
}

macro_rules! stored {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Stored for $ty {
                fn rows(snapshot: &Snapshot) -> &Vec<Self> {
                    &snapshot.$field
                }
            }
        )*
    };
}

stored! {
    Product => products,
    BomLine => bill_of_materials,
    PurchaseOrder => purchase_orders,
    PurchaseOrderLine => purchase_order_lines,
    SalesOrder => sales_orders,
    SalesOrderLine => sales_order_lines,
    InventoryTransaction => inventory_transactions,
    InventoryOnHand => inventory_on_hand,
    LowStockAlert => low_stock_alerts,
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Snapshot,
    loading: bool,
    last_error: Option<String>,
}

/// Client-side mirror of the backend tables
pub struct EntityStore<G: Gateway> {
    gateway: Arc<G>,
    state: RwLock<StoreState>,
}

fn ensure_writable(table: Table) -> AppResult<()> {
    if table.is_writable() {
        Ok(())
    } else {
        Err(AppError::ReadOnlyTable(table))
    }
}

impl<G: Gateway> EntityStore<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Reads every loaded table concurrently and swaps in the result at once.
    /// The first failing read fails the whole load and leaves the previous
    /// snapshot in place.
    pub async fn load_all(&self) -> AppResult<()> {
        self.state.write().loading = true;
        info!("Loading all tables");

        let result = self.fetch_snapshot().await;

        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(snapshot) => {
                info!(
                    products = snapshot.products.len(),
                    sales_orders = snapshot.sales_orders.len(),
                    transactions = snapshot.inventory_transactions.len(),
                    "Tables loaded"
                );
                state.snapshot = snapshot;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Initial load failed");
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self) -> AppResult<Snapshot> {
        let (
            products,
            bill_of_materials,
            purchase_orders,
            purchase_order_lines,
            sales_orders,
            sales_order_lines,
            inventory_transactions,
            inventory_on_hand,
            low_stock_alerts,
        ) = tokio::try_join!(
            self.fetch::<Product>(),
            self.fetch::<BomLine>(),
            self.fetch::<PurchaseOrder>(),
            self.fetch::<PurchaseOrderLine>(),
            self.fetch::<SalesOrder>(),
            self.fetch::<SalesOrderLine>(),
            self.fetch::<InventoryTransaction>(),
            self.fetch::<InventoryOnHand>(),
            self.fetch::<LowStockAlert>(),
        )?;

        Ok(Snapshot {
            products,
            bill_of_materials,
            purchase_orders,
            purchase_order_lines,
            sales_orders,
            sales_order_lines,
            inventory_transactions,
            inventory_on_hand,
            low_stock_alerts,
        })
    }

    async fn fetch<T: Entity>(&self) -> AppResult<Vec<T>> {
        self.gateway
            .read(T::TABLE)
            .await?
            .into_iter()
            .map(|row| T::decode(row).map_err(|e| AppError::decode(T::TABLE, e)))
            .collect()
    }

    /// Overwrites the product collection with the cost view
    pub async fn refresh_products(&self) -> AppResult<()> {
        let products = self.fetch::<Product>().await?;
        debug!(count = products.len(), "Product costs refreshed");
        self.state.write().snapshot.products = products;
        Ok(())
    }

    /// Re-reads the on-hand and low-stock views
    pub async fn refresh_derived_views(&self) -> AppResult<()> {
        let (on_hand, low_stock) =
            tokio::try_join!(self.fetch::<InventoryOnHand>(), self.fetch::<LowStockAlert>())?;
        let mut state = self.state.write();
        state.snapshot.inventory_on_hand = on_hand;
        state.snapshot.low_stock_alerts = low_stock;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Merges a change into the mirror
    pub fn apply_change(&self, table: Table, event: &ChangeEvent) -> AppResult<bool> {
        let changed = self.state.write().snapshot.apply(table, event)?;
        debug!(%table, kind = event.kind.as_str(), changed, "Merged change");
        Ok(changed)
    }

    /// Inserts a row and merges the created row into the mirror
    pub async fn insert_row(&self, table: Table, fields: Map<String, Value>) -> AppResult<Value> {
        ensure_writable(table)?;
        let created = self.gateway.insert(table, fields).await?;
        self.apply_change(table, &ChangeEvent::insert(created.clone()))?;
        Ok(created)
    }

    pub async fn update_row(
        &self,
        table: Table,
        id: RowId,
        fields: Map<String, Value>,
    ) -> AppResult<Value> {
        ensure_writable(table)?;
        let updated = self.gateway.update(table, id, fields).await?;
        self.apply_change(table, &ChangeEvent::update(updated.clone()))?;
        Ok(updated)
    }

    pub async fn remove(&self, table: Table, id: RowId) -> AppResult<()> {
        ensure_writable(table)?;
        self.gateway.delete(table, id).await?;
        let mut key = Map::new();
        key.insert(table.key_column().to_string(), Value::from(id));
        self.apply_change(table, &ChangeEvent::delete(Value::Object(key)))?;
        Ok(())
    }

    /// Typed insert: returns the created entity with its server id and defaults
    pub async fn insert<T: Stored>(&self, payload: &impl Serialize) -> AppResult<T> {
        let created = self.insert_row(T::TABLE, to_fields(payload)?).await?;
        T::decode(created).map_err(|e| AppError::decode(T::TABLE, e))
    }

    /// Typed partial update
    pub async fn update<T: Stored>(&self, id: RowId, patch: &impl Serialize) -> AppResult<T> {
        let updated = self.update_row(T::TABLE, id, to_fields(patch)?).await?;
        T::decode(updated).map_err(|e| AppError::decode(T::TABLE, e))
    }

    /// Runs a named procedure, then re-reads the derived views it affects.
    /// A failed re-read is logged; the procedure has already committed.
    pub async fn invoke_procedure(&self, procedure: Procedure) -> AppResult<Value> {
        info!(%procedure, "Invoking procedure");
        let result = self.gateway.invoke(procedure).await?;
        if let Err(e) = self.refresh_derived_views().await {
            warn!(%procedure, error = %e, "Derived view refresh failed after procedure");
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        self.state.read().snapshot.clone()
    }

    /// Runs `f` against the current snapshot without copying it
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&self.state.read().snapshot)
    }

    pub fn rows<T: Stored>(&self) -> Vec<T> {
        T::rows(&self.state.read().snapshot).clone()
    }

    pub fn get<T: Stored>(&self, id: RowId) -> Option<T> {
        T::rows(&self.state.read().snapshot)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Message of the last failed load, cleared by a successful one
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }
}
