//! Balance reconstruction services

pub mod batch;
pub mod cache;
pub mod calculator;
pub mod classifier;
pub mod engine;
pub mod replay;
pub mod reporting;
pub mod validator;

pub use batch::{BatchError, BatchOutcome, CancelHandle};
pub use cache::BalanceCache;
pub use calculator::PointInTimeCalculator;
pub use classifier::MovementClassifier;
pub use engine::{ProductStockDetail, StockEngine};
pub use replay::{BalanceReplayer, ReplayStep};
pub use reporting::ReportingService;
pub use validator::{DiscrepancyScan, DiscrepancyValidator, ValidationResult};
