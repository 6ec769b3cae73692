//! Remote data gateway
//!
//! The backend owns every table. The client reads whole relations, writes
//! single rows, calls named procedures, and (where the transport supports
//! it) listens to per-table change notifications.

mod memory;
mod rest;

pub use memory::InMemoryGateway;
pub use rest::RestGateway;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use shared::{ChangeEvent, Procedure, RowId, Table};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Row-level access to the backend
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// All rows of a table, id ascending for base tables
    async fn read(&self, table: Table) -> AppResult<Vec<Value>>;

    /// Creates a row and returns it with server-assigned id and defaults
    async fn insert(&self, table: Table, fields: Map<String, Value>) -> AppResult<Value>;

    /// Partial update; `NotFound` when no row has this id
    async fn update(&self, table: Table, id: RowId, fields: Map<String, Value>) -> AppResult<Value>;

    async fn delete(&self, table: Table, id: RowId) -> AppResult<()>;

    async fn invoke(&self, procedure: Procedure) -> AppResult<Value>;
}

/// Per-table push notifications
pub trait ChangeFeed: Send + Sync + 'static {
    fn subscribe(
        &self,
        table: Table,
    ) -> AppResult<(SubscriptionId, mpsc::UnboundedReceiver<ChangeEvent>)>;

    /// Stops delivery; the receiver sees the end of the stream
    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An open subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    table: Table,
    feed: Arc<dyn ChangeFeed>,
}

impl Subscription {
    pub fn open(
        feed: Arc<dyn ChangeFeed>,
        table: Table,
    ) -> AppResult<(Self, mpsc::UnboundedReceiver<ChangeEvent>)> {
        let (id, events) = feed.subscribe(table)?;
        tracing::debug!(%table, subscription = %id, "Subscribed");
        Ok((Self { id, table, feed }, events))
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn table(&self) -> Table {
        self.table
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feed.unsubscribe(self.id);
        tracing::debug!(table = %self.table, subscription = %self.id, "Unsubscribed");
    }
}

/// Serializes a payload into the field map sent to the gateway
pub fn to_fields<T: Serialize>(payload: &T) -> AppResult<Map<String, Value>> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(AppError::Internal(format!(
            "Payload must be an object, got {}",
            other
        ))),
        Err(e) => Err(AppError::Internal(format!("Failed to encode payload: {}", e))),
    }
}
