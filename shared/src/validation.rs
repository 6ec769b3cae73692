//! Validation utilities for the Inventory Dashboard
//!
//! The backend enforces referential integrity; these checks only catch input
//! that would otherwise fail halfway through a multi-step write.

use rust_decimal::Decimal;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::models::{
    ComponentDraft, NewProduct, NewPurchaseOrder, Product, ProductKind, SalesOrderDraft,
};
use crate::types::RowId;

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationErrors> for FieldError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(name, _)| *name);
        match fields.first().and_then(|(name, errs)| errs.first().map(|e| (*name, e))) {
            Some((name, e)) => FieldError::new(
                name,
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid {}", e.code)),
            ),
            None => FieldError::new("input", "invalid input"),
        }
    }
}

// ============================================================================
// Field checks
// ============================================================================

/// Validate SKU format (non-empty, no whitespace)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.trim().is_empty() {
        return Err("SKU is required");
    }
    if sku.chars().any(char::is_whitespace) {
        return Err("SKU cannot contain whitespace");
    }
    Ok(())
}

/// Validate a BOM or line quantity
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a money amount entered by hand
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Only base products can be kit components
pub fn validate_component(component: &Product) -> Result<(), &'static str> {
    if component.kind != ProductKind::Base {
        return Err("Kit components must be base products");
    }
    Ok(())
}

fn check(field: &str, result: Result<(), &'static str>) -> Result<(), FieldError> {
    result.map_err(|message| FieldError::new(field, message))
}

// ============================================================================
// Form checks
// ============================================================================

pub fn validate_new_product(product: &NewProduct) -> Result<(), FieldError> {
    product.validate()?;
    check("sku", validate_sku(&product.sku))?;
    check("avg_cost", validate_amount(product.avg_cost))?;
    check("reorder_level", validate_amount(product.reorder_level))
}

/// Every component must name an existing base product, other than the kit itself
pub fn validate_kit_components(
    kit_product_id: Option<RowId>,
    components: &[ComponentDraft],
    products: &[Product],
) -> Result<(), FieldError> {
    for (i, component) in components.iter().enumerate() {
        let field = format!("components[{i}]");
        if Some(component.component_product_id) == kit_product_id {
            return Err(FieldError::new(field, "A kit cannot contain itself"));
        }
        let product = products
            .iter()
            .find(|p| p.id == component.component_product_id)
            .ok_or_else(|| FieldError::new(&field, "Unknown component product"))?;
        check(&field, validate_component(product))?;
        check(&field, validate_quantity(component.quantity))?;
    }
    Ok(())
}

pub fn validate_purchase_order(order: &NewPurchaseOrder) -> Result<(), FieldError> {
    order.validate()?;
    check("freight_in", validate_amount(order.freight_in))?;
    check("import_duty", validate_amount(order.import_duty))?;
    check("other_charges", validate_amount(order.other_charges))
}

pub fn validate_sales_draft(draft: &SalesOrderDraft) -> Result<(), FieldError> {
    if draft.customer.trim().is_empty() {
        return Err(FieldError::new("customer", "Customer is required"));
    }
    if draft.lines.is_empty() {
        return Err(FieldError::new("lines", "At least one line is required"));
    }
    check("shipping_cost", validate_amount(draft.shipping_cost))?;
    for (i, line) in draft.lines.iter().enumerate() {
        let field = format!("lines[{i}]");
        check(&field, validate_quantity(line.qty))?;
        check(&field, validate_amount(line.unit_price))?;
        if line.product_id.filter(|id| *id != 0).is_none() && line.description.trim().is_empty() {
            return Err(FieldError::new(field, "Manual lines need a description"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SaleLineDraft;
    use chrono::NaiveDate;

    fn product(id: RowId, kind: ProductKind) -> Product {
        Product {
            id,
            sku: format!("P{id}"),
            name: format!("Product {id}"),
            kind,
            avg_cost: Decimal::ONE,
            computed_cost: None,
            reorder_level: Decimal::ZERO,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("A1").is_ok());
        assert!(validate_sku("  ").is_err());
        assert!(validate_sku("A 1").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(Decimal::ONE).is_ok());
        assert!(validate_quantity(Decimal::ZERO).is_err());
        assert!(validate_quantity(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_kit_components_must_be_base() {
        let products = vec![product(1, ProductKind::Base), product(2, ProductKind::Kit)];
        let ok = vec![ComponentDraft::new(1, Decimal::from(3))];
        assert!(validate_kit_components(Some(5), &ok, &products).is_ok());

        let nested = vec![ComponentDraft::new(2, Decimal::ONE)];
        let err = validate_kit_components(Some(5), &nested, &products).unwrap_err();
        assert_eq!(err.field, "components[0]");

        let missing = vec![ComponentDraft::new(9, Decimal::ONE)];
        assert!(validate_kit_components(None, &missing, &products).is_err());

        let zero = vec![ComponentDraft::new(1, Decimal::ZERO)];
        assert!(validate_kit_components(None, &zero, &products).is_err());
    }

    #[test]
    fn test_new_product_uses_derived_rules() {
        let p = NewProduct {
            sku: String::new(),
            name: "Bolt".into(),
            kind: ProductKind::Base,
            avg_cost: Decimal::ONE,
            reorder_level: Decimal::ZERO,
        };
        assert_eq!(validate_new_product(&p).unwrap_err().field, "sku");
    }

    #[test]
    fn test_sales_draft_checks() {
        let mut draft = SalesOrderDraft {
            customer: "Jane".into(),
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            shipping_cost: Decimal::ZERO,
            comments: None,
            is_gift: false,
            lines: vec![SaleLineDraft {
                product_id: None,
                description: "Setup".into(),
                qty: Decimal::ONE,
                unit_price: Decimal::TEN,
            }],
        };
        assert!(validate_sales_draft(&draft).is_ok());

        draft.lines[0].description.clear();
        assert_eq!(validate_sales_draft(&draft).unwrap_err().field, "lines[0]");

        draft.lines.clear();
        assert_eq!(validate_sales_draft(&draft).unwrap_err().field, "lines");
    }
}
