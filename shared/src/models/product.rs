//! Products and kits

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Entity;
use crate::table::{CellValue, TableRow};
use crate::types::{RowId, Table};

/// Base products carry their own average cost; kit cost is derived from the BOM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    #[default]
    Base,
    Kit,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Base => "base",
            ProductKind::Kit => "kit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RowId,
    pub sku: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    #[serde(default)]
    pub avg_cost: Decimal,
    /// Only present on rows read from the cost view
    #[serde(default)]
    pub computed_cost: Option<Decimal>,
    #[serde(default)]
    pub reorder_level: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_kit(&self) -> bool {
        self.kind == ProductKind::Kit
    }

    /// Cost used for valuation: the derived cost when known, else the average cost
    pub fn effective_cost(&self) -> Decimal {
        self.computed_cost.unwrap_or(self.avg_cost)
    }
}

impl Entity for Product {
    const TABLE: Table = Table::Products;

    fn id(&self) -> RowId {
        self.id
    }

    // Raw table notifications lack computed_cost; keep the last known value
    // until the cost view is refetched.
    fn merge_from(&mut self, incoming: Self) {
        let previous = self.computed_cost;
        *self = incoming;
        if self.computed_cost.is_none() {
            self.computed_cost = previous;
        }
    }
}

impl TableRow for Product {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "sku" => self.sku.as_str().into(),
            "name" => self.name.as_str().into(),
            "type" => self.kind.as_str().into(),
            "avg_cost" => self.avg_cost.into(),
            "computed_cost" => self.computed_cost.into(),
            "effective_cost" => self.effective_cost().into(),
            "reorder_level" => self.reorder_level.into(),
            _ => CellValue::Null,
        }
    }
}

/// Insert payload for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    pub avg_cost: Decimal,
    pub reorder_level: Decimal,
}

impl NewProduct {
    /// Kits never store an average cost of their own
    pub fn normalized(mut self) -> Self {
        if self.kind == ProductKind::Kit {
            self.avg_cost = Decimal::ZERO;
        }
        self
    }
}

/// Partial update for a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProductKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorder_level: Option<Decimal>,
}

impl From<NewProduct> for ProductPatch {
    fn from(p: NewProduct) -> Self {
        Self {
            sku: Some(p.sku),
            name: Some(p.name),
            kind: Some(p.kind),
            avg_cost: Some(p.avg_cost),
            reorder_level: Some(p.reorder_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_product_decodes_wire_shape() {
        let p: Product = serde_json::from_value(json!({
            "id": 2, "sku": "K1", "name": "Kit", "type": "kit",
            "avg_cost": 0, "computed_cost": 7.5, "reorder_level": 5,
            "created_at": "2025-07-01T10:00:00+00:00"
        }))
        .unwrap();
        assert!(p.is_kit());
        assert_eq!(p.effective_cost(), dec("7.5"));
        assert!(p.created_at.is_some());
    }

    #[test]
    fn test_merge_keeps_known_computed_cost() {
        let mut current: Product = serde_json::from_value(json!({
            "id": 1, "sku": "A1", "name": "Bolt", "type": "base",
            "avg_cost": 2.5, "computed_cost": 2.5, "reorder_level": 0
        }))
        .unwrap();
        let raw: Product = serde_json::from_value(json!({
            "id": 1, "sku": "A1", "name": "Bolt M4", "type": "base",
            "avg_cost": 2.5, "reorder_level": 0
        }))
        .unwrap();
        current.merge_from(raw);
        assert_eq!(current.name, "Bolt M4");
        assert_eq!(current.computed_cost, Some(dec("2.5")));
    }

    #[test]
    fn test_effective_cost_falls_back_to_avg_cost() {
        let p: Product = serde_json::from_value(json!({
            "id": 1, "sku": "A1", "name": "Bolt", "type": "base", "avg_cost": "2.50"
        }))
        .unwrap();
        assert_eq!(p.effective_cost(), dec("2.50"));
        assert_eq!(p.cell("computed_cost"), CellValue::Null);
    }

    #[test]
    fn test_new_kit_drops_avg_cost() {
        let p = NewProduct {
            sku: "K1".into(),
            name: "Kit".into(),
            kind: ProductKind::Kit,
            avg_cost: dec("3"),
            reorder_level: Decimal::ZERO,
        }
        .normalized();
        assert_eq!(p.avg_cost, Decimal::ZERO);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = ProductPatch {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "name": "Renamed" }));
    }
}
