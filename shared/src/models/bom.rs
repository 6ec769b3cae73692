//! Bill of materials

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Entity;
use crate::table::{CellValue, TableRow};
use crate::types::{RowId, Table};

pub const DEFAULT_UNIT_OF_MEASURE: &str = "each";

fn default_unit() -> String {
    DEFAULT_UNIT_OF_MEASURE.to_string()
}

/// One component line of a kit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub id: RowId,
    pub kit_product_id: RowId,
    /// Always a base product
    pub component_product_id: RowId,
    pub quantity: Decimal,
    #[serde(default = "default_unit")]
    pub unit_of_measure: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for BomLine {
    const TABLE: Table = Table::BillOfMaterials;

    fn id(&self) -> RowId {
        self.id
    }
}

impl TableRow for BomLine {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "kit_product_id" => self.kit_product_id.into(),
            "component_product_id" => self.component_product_id.into(),
            "quantity" => self.quantity.into(),
            "unit_of_measure" => self.unit_of_measure.as_str().into(),
            _ => CellValue::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewBomLine {
    pub kit_product_id: RowId,
    pub component_product_id: RowId,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 32))]
    #[serde(default = "default_unit")]
    pub unit_of_measure: String,
}

impl NewBomLine {
    pub fn new(kit_product_id: RowId, component_product_id: RowId, quantity: Decimal) -> Self {
        Self {
            kit_product_id,
            component_product_id,
            quantity,
            unit_of_measure: default_unit(),
        }
    }
}

/// Component line as edited on a kit form, before the kit id is known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDraft {
    pub component_product_id: RowId,
    pub quantity: Decimal,
    #[serde(default = "default_unit")]
    pub unit_of_measure: String,
}

impl ComponentDraft {
    pub fn new(component_product_id: RowId, quantity: Decimal) -> Self {
        Self {
            component_product_id,
            quantity,
            unit_of_measure: default_unit(),
        }
    }

    pub fn for_kit(&self, kit_product_id: RowId) -> NewBomLine {
        NewBomLine {
            kit_product_id,
            component_product_id: self.component_product_id,
            quantity: self.quantity,
            unit_of_measure: self.unit_of_measure.clone(),
        }
    }
}
