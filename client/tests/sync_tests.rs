//! Entity store and live update tests
//!
//! Covers:
//! - Idempotent merging of direct results and pushed notifications
//! - Product cost refresh after product and BOM changes
//! - Load failure handling
//! - Subscription cleanup

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;

use inventory_dashboard_client::gateway::InMemoryGateway;
use inventory_dashboard_client::{views, EntityStore, Reconciler, Snapshot};
use shared::{project, BomLine, ChangeEvent, Product, SalesOrder, Table, TableQuery};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product_row(id: i64, sku: &str, kind: &str, avg_cost: &str, computed_cost: Option<&str>) -> Value {
    json!({
        "id": id,
        "sku": sku,
        "name": format!("Product {sku}"),
        "type": kind,
        "avg_cost": avg_cost,
        "computed_cost": computed_cost,
        "reorder_level": "0"
    })
}

fn bom_row(id: i64, quantity: &str) -> Value {
    json!({
        "id": id,
        "kit_product_id": 2,
        "component_product_id": 1,
        "quantity": quantity,
        "unit_of_measure": "each"
    })
}

fn sale_row(id: i64) -> Value {
    json!({
        "id": id,
        "customer": "Ada",
        "date": "2025-07-03",
        "shipping_cost": "0",
        "comments": null,
        "is_gift": false,
        "total_price": "0",
        "total_cogs": "0"
    })
}

/// Products A1 (base, 2.50) and K1 (kit of three A1, cost not yet computed)
fn catalogue() -> InMemoryGateway {
    InMemoryGateway::new()
        .with_rows(
            Table::Products,
            vec![
                product_row(1, "A1", "base", "2.50", Some("2.50")),
                product_row(2, "K1", "kit", "0", None),
            ],
        )
        .with_rows(Table::BillOfMaterials, vec![bom_row(10, "3")])
}

async fn loaded(gateway: InMemoryGateway) -> (Arc<InMemoryGateway>, Arc<EntityStore<InMemoryGateway>>) {
    let gateway = Arc::new(gateway);
    let store = Arc::new(EntityStore::new(Arc::clone(&gateway)));
    store.load_all().await.unwrap();
    (gateway, store)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_kit_cost_update_changes_only_the_kit() {
        let (_, store) = loaded(catalogue()).await;
        let before = store.get::<Product>(1).unwrap();

        let event = ChangeEvent::update(product_row(2, "K1", "kit", "0", Some("7.50")));
        assert!(store.apply_change(Table::Products, &event).unwrap());

        let kit = store.get::<Product>(2).unwrap();
        assert_eq!(kit.computed_cost, Some(dec("7.50")));
        assert_eq!(kit.effective_cost(), dec("7.50"));
        assert_eq!(store.get::<Product>(1).unwrap(), before);
    }

    #[tokio::test]
    async fn test_global_search_finds_only_matching_product() {
        let (_, store) = loaded(catalogue()).await;
        let columns = views::columns(Table::Products);
        let query = TableQuery::new().with_search("A1");

        let ids: Vec<i64> = store.with_snapshot(|s| {
            project(&columns, &s.products, &query)
                .into_iter()
                .map(|p| p.id)
                .collect()
        });
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_update_for_absent_id_is_a_noop() {
        let (_, store) = loaded(catalogue()).await;
        let before = store.snapshot();

        let event = ChangeEvent::update(product_row(99, "Z9", "base", "1", None));
        assert!(!store.apply_change(Table::Products, &event).unwrap());
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_duplicate_insert_events_keep_one_row() {
        let (_, store) = loaded(catalogue()).await;
        let event = ChangeEvent::insert(sale_row(50));

        store.apply_change(Table::SalesOrders, &event).unwrap();
        store.apply_change(Table::SalesOrders, &event).unwrap();

        assert_eq!(store.rows::<SalesOrder>().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_without_cost_keeps_computed_cost() {
        let (_, store) = loaded(catalogue()).await;

        // Raw base-table rows never carry the computed cost
        let mut row = product_row(1, "A1", "base", "2.50", None);
        row["name"] = json!("Anchor bolt, zinc");
        store
            .apply_change(Table::Products, &ChangeEvent::update(row))
            .unwrap();

        let product = store.get::<Product>(1).unwrap();
        assert_eq!(product.name, "Anchor bolt, zinc");
        assert_eq!(product.computed_cost, Some(dec("2.50")));
    }

    #[tokio::test]
    async fn test_undecodable_event_is_rejected() {
        let (_, store) = loaded(catalogue()).await;
        let before = store.snapshot();

        let result = store.apply_change(Table::Products, &ChangeEvent::insert(json!({ "id": 3 })));
        assert_eq!(result.unwrap_err().code(), "DECODE_ERROR");
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_snapshot() {
        let (gateway, store) = loaded(catalogue()).await;
        let before = store.snapshot();

        gateway.fail_reads(Table::SalesOrders, "connection reset");
        let err = store.load_all().await.unwrap_err();
        assert_eq!(err.code(), "GATEWAY_ERROR");
        assert_eq!(store.snapshot(), before);
        assert!(!store.is_loading());
        assert!(store.last_error().unwrap().contains("connection reset"));

        gateway.clear_failures();
        store.load_all().await.unwrap();
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_first_load_leaves_store_empty() {
        let gateway = catalogue();
        gateway.fail_reads(Table::InventoryOnHand, "view missing");
        let store = EntityStore::new(Arc::new(gateway));

        assert!(store.load_all().await.is_err());
        assert_eq!(store.snapshot(), Snapshot::default());
    }
}

// ============================================================================
// Live Update Tests
// ============================================================================

#[cfg(test)]
mod live_tests {
    use super::*;

    #[tokio::test]
    async fn test_product_and_bom_events_refresh_costs_once_each() {
        let (gateway, store) = loaded(catalogue()).await;
        assert_eq!(gateway.read_count(Table::Products), 1);

        let live = Reconciler::new(Arc::clone(&store))
            .start(Arc::clone(&gateway))
            .unwrap();
        gateway.emit(
            Table::Products,
            ChangeEvent::update(product_row(1, "A1", "base", "2.75", None)),
        );
        gateway.emit(Table::BillOfMaterials, ChangeEvent::update(bom_row(10, "4")));
        gateway.emit(Table::SalesOrders, ChangeEvent::insert(sale_row(50)));
        live.shutdown().await;

        assert_eq!(gateway.read_count(Table::Products), 3);
        assert_eq!(store.get::<BomLine>(10).unwrap().quantity, dec("4"));
        assert_eq!(store.rows::<SalesOrder>().len(), 1);
    }

    #[tokio::test]
    async fn test_bom_change_picks_up_backend_kit_cost() {
        let (gateway, store) = loaded(catalogue()).await;
        let live = Reconciler::new(Arc::clone(&store))
            .start(Arc::clone(&gateway))
            .unwrap();

        // The backend has recomputed the kit by the time the event arrives
        gateway.set_rows(
            Table::Products,
            vec![
                product_row(1, "A1", "base", "2.50", Some("2.50")),
                product_row(2, "K1", "kit", "0", Some("7.50")),
            ],
        );
        gateway.emit(Table::BillOfMaterials, ChangeEvent::update(bom_row(10, "3")));
        live.shutdown().await;

        assert_eq!(store.get::<Product>(2).unwrap().effective_cost(), dec("7.50"));
        assert_eq!(store.get::<Product>(1).unwrap().effective_cost(), dec("2.50"));
    }

    #[tokio::test]
    async fn test_direct_result_and_echo_merge_into_one_row() {
        let (gateway, store) = loaded(catalogue()).await;
        let live = Reconciler::new(Arc::clone(&store))
            .start(Arc::clone(&gateway))
            .unwrap();

        let mut fields = sale_row(0);
        fields.as_object_mut().unwrap().remove("id");
        let created: SalesOrder = store.insert(&fields).await.unwrap();
        live.shutdown().await;

        let orders = store.rows::<SalesOrder>();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, created.id);
    }

    #[tokio::test]
    async fn test_dropped_events_do_not_trigger_refresh() {
        let (gateway, store) = loaded(catalogue()).await;
        let reconciler = Reconciler::new(Arc::clone(&store));

        reconciler
            .handle(Table::Products, ChangeEvent::insert(json!({ "id": 3 })))
            .await;

        assert_eq!(store.rows::<Product>().len(), 2);
        assert_eq!(gateway.read_count(Table::Products), 1);
    }

    #[tokio::test]
    async fn test_dropping_live_sync_unsubscribes_every_table() {
        let (gateway, store) = loaded(catalogue()).await;
        let live = Reconciler::new(Arc::clone(&store))
            .start(Arc::clone(&gateway))
            .unwrap();

        let tables = live.tables();
        assert!(tables.contains(&Table::Products));
        assert!(tables.contains(&Table::BillOfMaterials));
        assert!(!tables.contains(&Table::InventoryOnHand));
        assert_eq!(gateway.subscriber_count(), tables.len());

        drop(live);
        assert_eq!(gateway.subscriber_count(), 0);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum Other {
        Insert(i64),
        Update(i64),
        Delete(i64),
    }

    impl Other {
        fn event(&self) -> ChangeEvent {
            match self {
                Other::Insert(id) => ChangeEvent::insert(bom_row(*id, "1")),
                Other::Update(id) => ChangeEvent::update(bom_row(*id, "2")),
                Other::Delete(id) => ChangeEvent::delete(json!({ "id": id })),
            }
        }
    }

    fn other_strategy() -> impl Strategy<Value = Other> {
        (51i64..100, 0u8..3).prop_map(|(id, kind)| match kind {
            0 => Other::Insert(id),
            1 => Other::Update(id),
            _ => Other::Delete(id),
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Insert X, then delete X: X is gone whatever else arrives around it
        #[test]
        fn prop_insert_then_delete_leaves_no_row(
            id in 1i64..50,
            before in prop::collection::vec(other_strategy(), 0..10),
            after in prop::collection::vec(other_strategy(), 0..10),
        ) {
            let mut snapshot = Snapshot::default();
            let table = Table::BillOfMaterials;

            snapshot.apply(table, &ChangeEvent::insert(bom_row(id, "3"))).unwrap();
            for other in &before {
                snapshot.apply(table, &other.event()).unwrap();
            }
            snapshot.apply(table, &ChangeEvent::delete(json!({ "id": id }))).unwrap();
            for other in &after {
                snapshot.apply(table, &other.event()).unwrap();
            }

            prop_assert!(snapshot.bill_of_materials.iter().all(|l| l.id != id));
        }

        /// An update for an id that is not mirrored changes nothing
        #[test]
        fn prop_update_for_absent_id_is_ignored(
            ids in prop::collection::btree_set(1i64..50, 0..10),
            absent in 50i64..100,
        ) {
            let mut snapshot = Snapshot::default();
            for id in &ids {
                snapshot
                    .apply(Table::BillOfMaterials, &ChangeEvent::insert(bom_row(*id, "1")))
                    .unwrap();
            }
            let before = snapshot.clone();

            let changed = snapshot
                .apply(Table::BillOfMaterials, &ChangeEvent::update(bom_row(absent, "9")))
                .unwrap();

            prop_assert!(!changed);
            prop_assert_eq!(snapshot, before);
        }

        /// Replaying an insert any number of times yields one row
        #[test]
        fn prop_repeated_inserts_are_idempotent(id in 1i64..50, repeats in 1usize..5) {
            let mut snapshot = Snapshot::default();
            for _ in 0..repeats {
                snapshot
                    .apply(Table::BillOfMaterials, &ChangeEvent::insert(bom_row(id, "3")))
                    .unwrap();
            }
            prop_assert_eq!(snapshot.bill_of_materials.len(), 1);
        }
    }
}
