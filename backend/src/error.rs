//! Error handling for the stock balance engine
//!
//! Every failure carries a stable reason code so single-item callers can fail
//! fast on it and batch callers can record it per item.

use serde::Serialize;
use shared::{ArithmeticOverflow, InputError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid argument {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A quantity or value left the `Decimal` range
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error")]
    InternalError(#[from] anyhow::Error),
}

/// Serializable failure detail, used in batch error lists
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn product_not_found(product_id: i64) -> Self {
        AppError::NotFound(format!("Product {}", product_id))
    }

    /// Stable reason code for callers
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        let (message, field) = match self {
            AppError::NotFound(resource) => (format!("{} not found", resource), None),
            AppError::InvalidArgument { field, message } => (message.clone(), Some(field.clone())),
            AppError::Configuration(msg) => (format!("Configuration error: {}", msg), None),
            AppError::ArithmeticOverflow(msg) => (format!("Arithmetic overflow: {}", msg), None),
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
            AppError::Internal(msg) => (msg.clone(), None),
            AppError::InternalError(_) => ("An internal error occurred".to_string(), None),
        };

        ErrorDetail {
            code: self.code().to_string(),
            message,
            field,
        }
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError::InvalidArgument {
            field: err.field.to_string(),
            message: err.message,
        }
    }
}

impl From<ArithmeticOverflow> for AppError {
    fn from(err: ArithmeticOverflow) -> Self {
        AppError::ArithmeticOverflow(format!("movement {}", err.movement_id))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias for engine operations
pub type AppResult<T> = Result<T, AppError>;
