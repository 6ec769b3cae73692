//! In-process gateway
//!
//! Keeps every table as a list of JSON rows and echoes each successful write
//! to the table's subscribers, the way the hosted backend's realtime channel
//! does. Used by the tests and by `invdash --demo`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use shared::{ChangeEvent, Procedure, RowId, Table};
use tokio::sync::mpsc;

use super::{ChangeFeed, Gateway, SubscriptionId};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Value>>,
    next_id: RowId,
    subscribers: HashMap<SubscriptionId, (Table, mpsc::UnboundedSender<ChangeEvent>)>,
    failing_reads: HashMap<Table, String>,
    failing_writes: HashMap<Table, String>,
    failing_procedures: HashMap<&'static str, String>,
    reads: HashMap<Table, usize>,
    invoked: Vec<Procedure>,
    echo: bool,
}

impl MemoryState {
    fn allocate_id(&mut self) -> RowId {
        self.next_id += 1;
        self.next_id
    }

    fn broadcast(&mut self, table: Table, event: ChangeEvent) {
        if !self.echo {
            return;
        }
        self.subscribers
            .retain(|_, (t, tx)| *t != table || tx.send(event.clone()).is_ok());
    }

    fn check_write(&self, table: Table) -> AppResult<()> {
        if !table.is_writable() {
            return Err(AppError::ReadOnlyTable(table));
        }
        match self.failing_writes.get(&table) {
            Some(message) => Err(AppError::Gateway {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn row_id(table: Table, row: &Value) -> Option<RowId> {
    row.get(table.key_column()).and_then(Value::as_i64)
}

/// Gateway backed by in-memory tables
pub struct InMemoryGateway {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                echo: true,
                ..Default::default()
            }),
        }
    }

    /// Replaces a table's rows. Ids handed out later never collide with these.
    pub fn set_rows(&self, table: Table, rows: Vec<Value>) {
        let mut state = self.state.lock();
        let max_id = rows.iter().filter_map(|r| row_id(table, r)).max().unwrap_or(0);
        state.next_id = state.next_id.max(max_id);
        state.tables.insert(table, rows);
    }

    pub fn with_rows(self, table: Table, rows: Vec<Value>) -> Self {
        self.set_rows(table, rows);
        self
    }

    /// Current rows of a table, including write-only ones
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.state.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    /// Pushes an event to the table's subscribers without touching the rows
    pub fn emit(&self, table: Table, event: ChangeEvent) {
        let mut state = self.state.lock();
        let echo = std::mem::replace(&mut state.echo, true);
        state.broadcast(table, event);
        state.echo = echo;
    }

    /// Whether successful writes are echoed as change events
    pub fn set_echo(&self, echo: bool) {
        self.state.lock().echo = echo;
    }

    pub fn fail_reads(&self, table: Table, message: impl Into<String>) {
        self.state.lock().failing_reads.insert(table, message.into());
    }

    pub fn fail_writes(&self, table: Table, message: impl Into<String>) {
        self.state.lock().failing_writes.insert(table, message.into());
    }

    pub fn fail_procedure(&self, name: &'static str, message: impl Into<String>) {
        self.state.lock().failing_procedures.insert(name, message.into());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_reads.clear();
        state.failing_writes.clear();
        state.failing_procedures.clear();
    }

    /// Number of reads served for a table
    pub fn read_count(&self, table: Table) -> usize {
        self.state.lock().reads.get(&table).copied().unwrap_or(0)
    }

    pub fn invoked(&self) -> Vec<Procedure> {
        self.state.lock().invoked.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// A small catalogue for offline use: one base product, one kit built
    /// from it, a received purchase order and the matching stock views.
    pub fn demo() -> Self {
        Self::new()
            .with_rows(
                Table::Products,
                vec![
                    json!({ "id": 1, "sku": "A1", "name": "Anchor bolt", "type": "base",
                            "avg_cost": 2.5, "computed_cost": 2.5, "reorder_level": 20 }),
                    json!({ "id": 2, "sku": "K1", "name": "Anchor kit", "type": "kit",
                            "avg_cost": 0, "computed_cost": 7.5, "reorder_level": 5 }),
                ],
            )
            .with_rows(
                Table::BillOfMaterials,
                vec![json!({ "id": 10, "kit_product_id": 2, "component_product_id": 1,
                             "quantity": 3, "unit_of_measure": "each" })],
            )
            .with_rows(
                Table::PurchaseOrders,
                vec![json!({ "id": 20, "vendor": "Fastener Supply", "date": "2025-07-01",
                             "freight_in": 12, "import_duty": 3, "other_charges": 0 })],
            )
            .with_rows(
                Table::PurchaseOrderLines,
                vec![json!({ "id": 21, "purchase_order_id": 20, "product_id": 1, "qty": 30,
                             "unit_cost": 2, "freight_alloc": 0.4, "duty_alloc": 0.1,
                             "other_alloc": 0, "landed_unit_cost": 2.5 })],
            )
            .with_rows(
                Table::InventoryTransactions,
                vec![json!({ "id": 30, "product_id": 1, "change_qty": 30, "txn_type": "purchase",
                             "reference_id": 20, "date": "2025-07-02", "unit_cost": 2.5 })],
            )
            .with_rows(
                Table::InventoryOnHand,
                vec![
                    json!({ "product_id": 1, "sku": "A1", "name": "Anchor bolt", "on_hand": 12,
                            "avg_cost": 2.5, "reorder_level": 20 }),
                    json!({ "product_id": 2, "sku": "K1", "name": "Anchor kit", "on_hand": 6,
                            "avg_cost": 0, "reorder_level": 5 }),
                ],
            )
            .with_rows(
                Table::LowStockAlerts,
                vec![json!({ "product_id": 1, "sku": "A1", "name": "Anchor bolt", "on_hand": 12,
                             "avg_cost": 2.5, "reorder_level": 20 })],
            )
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn read(&self, table: Table) -> AppResult<Vec<Value>> {
        let mut state = self.state.lock();
        *state.reads.entry(table).or_insert(0) += 1;
        if let Some(message) = state.failing_reads.get(&table) {
            return Err(AppError::Gateway {
                status: 503,
                message: message.clone(),
            });
        }
        if !table.is_loaded() {
            return Err(AppError::Internal(format!("Table {} is write-only", table)));
        }
        let mut rows = state.tables.get(&table).cloned().unwrap_or_default();
        if !table.is_derived_view() {
            rows.sort_by_key(|r| row_id(table, r));
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, fields: Map<String, Value>) -> AppResult<Value> {
        let mut state = self.state.lock();
        state.check_write(table)?;
        let id = state.allocate_id();
        let mut row = fields;
        row.insert("id".to_string(), json!(id));
        let row = Value::Object(row);
        state.tables.entry(table).or_default().push(row.clone());
        state.broadcast(table, ChangeEvent::insert(row.clone()));
        Ok(row)
    }

    async fn update(&self, table: Table, id: RowId, fields: Map<String, Value>) -> AppResult<Value> {
        let mut state = self.state.lock();
        state.check_write(table)?;
        let row = state
            .tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(table, r) == Some(id)))
            .ok_or(AppError::NotFound { table, id })?;
        if let Value::Object(existing) = row {
            existing.extend(fields);
        }
        let updated = row.clone();
        state.broadcast(table, ChangeEvent::update(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, table: Table, id: RowId) -> AppResult<()> {
        let mut state = self.state.lock();
        state.check_write(table)?;
        let removed = state.tables.get_mut(&table).and_then(|rows| {
            let index = rows.iter().position(|r| row_id(table, r) == Some(id))?;
            Some(rows.remove(index))
        });
        if removed.is_some() {
            state.broadcast(table, ChangeEvent::delete(json!({ "id": id })));
        }
        Ok(())
    }

    async fn invoke(&self, procedure: Procedure) -> AppResult<Value> {
        let mut state = self.state.lock();
        state.invoked.push(procedure);
        match state.failing_procedures.get(procedure.name()) {
            Some(message) => Err(AppError::Procedure {
                name: procedure.name().to_string(),
                message: message.clone(),
            }),
            None => Ok(Value::Null),
        }
    }
}

impl ChangeFeed for InMemoryGateway {
    fn subscribe(
        &self,
        table: Table,
    ) -> AppResult<(SubscriptionId, mpsc::UnboundedReceiver<ChangeEvent>)> {
        if !table.is_live() {
            return Err(AppError::Subscription(format!(
                "Table {} has no change notifications",
                table
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId::new();
        self.state.lock().subscribers.insert(id, (table, tx));
        Ok((id, rx))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock().subscribers.remove(&id);
    }
}
