//! Stock balance engine
//!
//! Reconstructs point-in-time inventory balances from an append-only movement
//! ledger, reconciles them against the stored quantity snapshot and ranks the
//! discrepancies.

pub mod config;
pub mod error;
pub mod ledger;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::StockEngine;
