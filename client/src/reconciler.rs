//! Change-Notification Reconciler
//!
//! One task per live table drains that table's notification stream in
//! arrival order and merges each event into the store. Product and BOM
//! changes can move kit costs, which only the backend computes, so those
//! events are followed by a full refetch of the product cost view.

use std::sync::Arc;

use shared::{ChangeEvent, Table};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::gateway::{ChangeFeed, Gateway, Subscription};
use crate::store::EntityStore;

pub struct Reconciler<G: Gateway> {
    store: Arc<EntityStore<G>>,
}

impl<G: Gateway> Clone for Reconciler<G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<G: Gateway> Reconciler<G> {
    pub fn new(store: Arc<EntityStore<G>>) -> Self {
        Self { store }
    }

    /// Applies one event. Undecodable events are logged and dropped.
    pub async fn handle(&self, table: Table, event: ChangeEvent) {
        match self.store.apply_change(table, &event) {
            Ok(_) => {}
            Err(e) => {
                warn!(%table, kind = event.kind.as_str(), error = %e, "Dropping change event");
                return;
            }
        }

        if table.invalidates_product_costs() {
            self.invalidate_product_costs().await;
        }
    }

    /// Replaces the local products with a fresh read of the cost view. On
    /// failure the current collection stays as it is.
    pub async fn invalidate_product_costs(&self) {
        if let Err(e) = self.store.refresh_products().await {
            warn!(error = %e, "Product cost refresh failed; keeping stale costs");
        }
    }

    /// Subscribes every live table. Dropping the returned handle ends them all.
    pub fn start<F: ChangeFeed>(&self, feed: Arc<F>) -> AppResult<LiveSync> {
        let feed: Arc<dyn ChangeFeed> = feed;
        let mut live = LiveSync::default();

        for table in Table::ALL.into_iter().filter(Table::is_live) {
            let (subscription, mut events) = Subscription::open(Arc::clone(&feed), table)?;
            let reconciler = self.clone();
            let task = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    reconciler.handle(table, event).await;
                }
                debug!(%table, "Change stream closed");
            });
            live.subscriptions.push(subscription);
            live.tasks.push(task);
        }

        info!(tables = live.subscriptions.len(), "Live updates started");
        Ok(live)
    }
}

/// Running live updates
#[derive(Default)]
pub struct LiveSync {
    subscriptions: Vec<Subscription>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveSync {
    pub fn tables(&self) -> Vec<Table> {
        self.subscriptions.iter().map(Subscription::table).collect()
    }

    /// Unsubscribes everything and waits for queued events to be applied
    pub async fn shutdown(mut self) {
        self.subscriptions.clear();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Live update task ended abnormally");
            }
        }
        info!("Live updates stopped");
    }
}

impl Drop for LiveSync {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
