//! Shared types and models for the stock balance engine
//!
//! This crate contains the ledger, catalog and snapshot types shared between
//! the engine, its storage adapters and any API layer built on top of it.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
