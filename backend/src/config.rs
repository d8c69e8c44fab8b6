//! Configuration management for the stock balance engine
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with SBE_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::Strategy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Replay and reconciliation settings
    pub engine: EngineConfig,

    /// Free-text markers used by the movement classifier
    pub classifier: ClassifierConfig,

    /// Defaults for the stock-audit scan
    pub audit: AuditConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Tolerance under which calculated and stored quantities agree
    pub epsilon: Decimal,

    /// Upper bound on products replayed concurrently in batch operations
    pub worker_limit: usize,

    /// Strategy used for historical queries unless a caller picks one
    pub default_strategy: Strategy,

    /// Keep computed historical balances in memory
    pub cache_enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Document reference that marks a balance reset
    pub reset_sentinel: String,

    pub reset_phrases: Vec<String>,

    pub cancellation_markers: Vec<String>,

    pub purchase_markers: Vec<String>,

    pub sale_markers: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    /// Minimum absolute difference reported by the scan
    pub threshold: Decimal,

    /// Maximum number of discrepancies reported
    pub limit: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("SBE_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let classifier = ClassifierConfig::default();

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("engine.epsilon", "0.01")?
            .set_default("engine.worker_limit", 8)?
            .set_default("engine.default_strategy", "forward")?
            .set_default("engine.cache_enabled", false)?
            .set_default("classifier.reset_sentinel", classifier.reset_sentinel)?
            .set_default("classifier.reset_phrases", classifier.reset_phrases)?
            .set_default("classifier.cancellation_markers", classifier.cancellation_markers)?
            .set_default("classifier.purchase_markers", classifier.purchase_markers)?
            .set_default("classifier.sale_markers", classifier.sale_markers)?
            .set_default("audit.threshold", "0")?
            .set_default("audit.limit", 100)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SBE_ prefix)
            .add_source(
                Environment::with_prefix("SBE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("classifier.reset_phrases")
                    .with_list_parse_key("classifier.cancellation_markers")
                    .with_list_parse_key("classifier.purchase_markers")
                    .with_list_parse_key("classifier.sale_markers")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon: Decimal::new(1, 2),
            worker_limit: 8,
            default_strategy: Strategy::Forward,
            cache_enabled: false,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            reset_sentinel: "SALDO_INICIAL".to_string(),
            reset_phrases: owned(&["SALDO INICIAL", "ACERTO DE INVENTARIO", "ZERAMENTO"]),
            cancellation_markers: owned(&["EXCLUSAO", "CANCELAMENTO", "ESTORNO"]),
            purchase_markers: owned(&["COMPRA", "ENTRADA"]),
            sale_markers: owned(&["VENDA", "SAIDA"]),
        }
    }
}
