//! Dashboard workflows
//!
//! Each service sequences store calls the way one dashboard page does. None
//! of the multi-step writes run inside a transaction: when a later step
//! fails, the steps already committed stay on the server and the error lists
//! them.

pub mod inventory;
pub mod products;
pub mod purchasing;
pub mod sales;

pub use inventory::InventoryService;
pub use products::ProductService;
pub use purchasing::PurchasingService;
pub use sales::SalesService;

use crate::error::AppError;

/// Committed steps of a running workflow
#[derive(Debug)]
pub(crate) struct Steps {
    workflow: &'static str,
    completed: Vec<String>,
}

impl Steps {
    pub(crate) fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            completed: Vec::new(),
        }
    }

    pub(crate) fn done(&mut self, step: impl Into<String>) {
        self.completed.push(step.into());
    }

    /// Wraps `err` as `Incomplete` once anything has been committed
    pub(crate) fn fail(&self, err: AppError) -> AppError {
        if self.completed.is_empty() {
            return err;
        }
        tracing::error!(
            workflow = self.workflow,
            completed = ?self.completed,
            error = %err,
            "Workflow stopped partway"
        );
        AppError::Incomplete {
            workflow: self.workflow,
            completed: self.completed.clone(),
            source: Box::new(err),
        }
    }
}
