//! Product catalogue and kit bills of materials

use std::sync::Arc;

use shared::{
    kit_cost_rows, validate_component, validate_kit_components, validate_new_product,
    validate_quantity, BomCostRow, BomLine, ComponentDraft, FieldError, NewBomLine, NewProduct,
    Product, ProductKind, ProductPatch, RowId, Table,
};
use tracing::{info, warn};
use validator::Validate;

use super::Steps;
use crate::error::{AppError, AppResult};
use crate::gateway::Gateway;
use crate::store::EntityStore;

/// Product service for maintaining products, kits and their components
pub struct ProductService<G: Gateway> {
    store: Arc<EntityStore<G>>,
}

impl<G: Gateway> Clone for ProductService<G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<G: Gateway> ProductService<G> {
    pub fn new(store: Arc<EntityStore<G>>) -> Self {
        Self { store }
    }

    pub fn kits(&self) -> Vec<Product> {
        self.by_kind(ProductKind::Kit)
    }

    pub fn base_products(&self) -> Vec<Product> {
        self.by_kind(ProductKind::Base)
    }

    fn by_kind(&self, kind: ProductKind) -> Vec<Product> {
        self.store.with_snapshot(|s| {
            s.products
                .iter()
                .filter(|p| p.kind == kind)
                .cloned()
                .collect()
        })
    }

    pub fn bom_lines(&self, kit_product_id: RowId) -> Vec<BomLine> {
        self.store.with_snapshot(|s| {
            s.bill_of_materials
                .iter()
                .filter(|l| l.kit_product_id == kit_product_id)
                .cloned()
                .collect()
        })
    }

    /// Component rows of a kit joined with current component costs
    pub fn kit_cost_rows(&self, kit_product_id: RowId) -> Vec<BomCostRow> {
        self.store
            .with_snapshot(|s| kit_cost_rows(kit_product_id, &s.bill_of_materials, &s.products))
    }

    /// Creates (`id` = None) or edits a product. For kits the component list
    /// replaces the existing BOM: old lines are deleted, then the new ones
    /// inserted.
    pub async fn save_product(
        &self,
        id: Option<RowId>,
        product: NewProduct,
        components: &[ComponentDraft],
    ) -> AppResult<Product> {
        validate_new_product(&product)?;
        let product = product.normalized();
        if product.kind == ProductKind::Kit {
            let products = self.store.rows::<Product>();
            validate_kit_components(id, components, &products)?;
        }

        let mut steps = Steps::new("save product");
        let saved: Product = match id {
            None => self.store.insert(&product).await,
            Some(id) => self.store.update(id, &ProductPatch::from(product)).await,
        }
        .map_err(|e| steps.fail(e))?;
        steps.done(format!("save products {}", saved.id));

        if id.is_some() {
            for line in self.bom_lines(saved.id) {
                self.store
                    .remove(Table::BillOfMaterials, line.id)
                    .await
                    .map_err(|e| steps.fail(e))?;
                steps.done(format!("delete bill_of_materials {}", line.id));
            }
        }

        if saved.kind == ProductKind::Kit {
            for component in components {
                let line: BomLine = self
                    .store
                    .insert(&component.for_kit(saved.id))
                    .await
                    .map_err(|e| steps.fail(e))?;
                steps.done(format!("insert bill_of_materials {}", line.id));
            }
        }

        self.refresh_costs().await;
        info!(product_id = saved.id, sku = %saved.sku, kind = saved.kind.as_str(), "Product saved");
        Ok(self.store.get::<Product>(saved.id).unwrap_or(saved))
    }

    /// Deletes a kit's BOM lines one by one, then the product itself
    pub async fn delete_product(&self, id: RowId) -> AppResult<()> {
        let mut steps = Steps::new("delete product");
        for line in self.bom_lines(id) {
            self.store
                .remove(Table::BillOfMaterials, line.id)
                .await
                .map_err(|e| steps.fail(e))?;
            steps.done(format!("delete bill_of_materials {}", line.id));
        }

        self.store
            .remove(Table::Products, id)
            .await
            .map_err(|e| steps.fail(e))?;

        info!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Adds (`id` = None) or edits one component line of a kit
    pub async fn save_bom_line(&self, id: Option<RowId>, line: NewBomLine) -> AppResult<BomLine> {
        line.validate().map_err(FieldError::from)?;
        let kit = self
            .store
            .get::<Product>(line.kit_product_id)
            .ok_or(AppError::NotFound {
                table: Table::Products,
                id: line.kit_product_id,
            })?;
        if kit.kind != ProductKind::Kit {
            return Err(FieldError::new("kit_product_id", "BOM lines belong to kit products").into());
        }
        if line.component_product_id == line.kit_product_id {
            return Err(
                FieldError::new("component_product_id", "A kit cannot contain itself").into(),
            );
        }
        let component = self
            .store
            .get::<Product>(line.component_product_id)
            .ok_or(AppError::NotFound {
                table: Table::Products,
                id: line.component_product_id,
            })?;
        validate_component(&component)
            .map_err(|message| FieldError::new("component_product_id", message))?;
        validate_quantity(line.quantity).map_err(|message| FieldError::new("quantity", message))?;

        let saved: BomLine = match id {
            None => self.store.insert(&line).await?,
            Some(id) => self.store.update(id, &line).await?,
        };
        self.refresh_costs().await;
        Ok(saved)
    }

    pub async fn delete_bom_line(&self, id: RowId) -> AppResult<()> {
        self.store.remove(Table::BillOfMaterials, id).await?;
        self.refresh_costs().await;
        Ok(())
    }

    // Kit costs only change server-side; pick them up without waiting for
    // a notification.
    async fn refresh_costs(&self) {
        if let Err(e) = self.store.refresh_products().await {
            warn!(error = %e, "Product cost refresh failed");
        }
    }
}
