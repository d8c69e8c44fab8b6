//! Common types used across the engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The single date format accepted on engine inputs
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date range for period queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
