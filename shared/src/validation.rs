//! Input validation for engine entry points
//!
//! Every check here runs before any ledger or catalog read.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{DateRange, DATE_FORMAT};

/// Rejected engine input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct InputError {
    pub field: &'static str,
    pub message: String,
}

impl InputError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Parse a date against the fixed `YYYY-MM-DD` format
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        InputError::new(
            field,
            format!("'{}' is not a valid date, expected YYYY-MM-DD", raw),
        )
    })
}

/// Thresholds and tolerances cannot be negative
pub fn validate_threshold(field: &'static str, value: Decimal) -> Result<Decimal, InputError> {
    if value < Decimal::ZERO {
        return Err(InputError::new(field, "must not be negative"));
    }
    Ok(value)
}

/// Limits arrive signed from outer layers; negative values are rejected
pub fn validate_limit(field: &'static str, value: i64) -> Result<usize, InputError> {
    usize::try_from(value).map_err(|_| InputError::new(field, "must not be negative"))
}

pub fn validate_range(range: &DateRange) -> Result<(), InputError> {
    if range.start > range.end {
        return Err(InputError::new("range", "start date is after end date"));
    }
    Ok(())
}
