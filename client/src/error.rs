//! Error handling for the Inventory Dashboard client
//!
//! Every failure the core can produce is one `AppError` variant with a stable
//! machine code, so callers can tell a gateway rejection from a half-finished
//! workflow without string matching.

use shared::{FieldError, RowId, Table};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Gateway errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("{table} row {id} not found")]
    NotFound { table: Table, id: RowId },

    #[error("Procedure {name} failed: {message}")]
    Procedure { name: String, message: String },

    #[error("Could not decode {table} row: {message}")]
    Decode { table: Table, message: String },

    // Client-side rejections
    #[error("Table {0} is read-only")]
    ReadOnlyTable(Table),

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    // Live updates
    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A multi-step write stopped partway; `completed` lists the steps that
    /// are already committed on the server.
    #[error("{workflow} incomplete after [{}]: {source}", .completed.join(", "))]
    Incomplete {
        workflow: &'static str,
        completed: Vec<String>,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Gateway { .. } => "GATEWAY_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Procedure { .. } => "PROCEDURE_FAILED",
            AppError::Decode { .. } => "DECODE_ERROR",
            AppError::ReadOnlyTable(_) => "READ_ONLY_TABLE",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Subscription(_) => "SUBSCRIPTION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Incomplete { .. } => "INCOMPLETE_WORKFLOW",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn decode(table: Table, err: impl std::fmt::Display) -> Self {
        AppError::Decode {
            table,
            message: err.to_string(),
        }
    }

    /// Innermost error of an incomplete workflow
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::Incomplete { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation {
            field: err.field,
            message: err.message,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias for the client core
pub type AppResult<T> = Result<T, AppError>;
