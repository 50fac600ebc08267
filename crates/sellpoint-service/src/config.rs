//! # Application Configuration
//!
//! Settings for the store, the database, checkout rules and the notifier.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SELLPOINT_TAX_RATE_BPS=1900                                        │
//! │     SELLPOINT_DB_PATH=/var/lib/sellpoint/sellpoint.db                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/sellpoint/sellpoint.toml (Linux)                         │
//! │     ~/Library/Application Support/com.sellpoint.sellpoint/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     19% tax, low stock below 10, notifier on                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Downtown Electronics"
//!
//! [database]
//! path = "sellpoint.db"
//! max_connections = 5
//!
//! [checkout]
//! tax_rate_bps = 1900
//! low_stock_threshold = 10
//!
//! [notifier]
//! enabled = true
//! sender = "billing@example.com"
//! poll_interval_secs = 5
//! batch_size = 20
//! max_attempts = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use sellpoint_core::validation::{validate_email, validate_tax_rate_bps};
use sellpoint_core::{TaxRate, DEFAULT_TAX_RATE_BPS, LOW_STOCK_THRESHOLD};
use sellpoint_db::DbConfig;

use crate::error::{ServiceError, ServiceResult};

const CONFIG_FILE_NAME: &str = "sellpoint.toml";

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Printed at the top of invoices.
    #[serde(default = "default_store_name")]
    pub name: String,
}

fn default_store_name() -> String {
    "Sellpoint Store".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("sellpoint.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Sales tax in basis points (1900 = 19%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    /// Quantities below this are reported as low stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

fn default_low_stock_threshold() -> i64 {
    LOW_STOCK_THRESHOLD
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            tax_rate_bps: default_tax_rate_bps(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierSettings {
    /// When off, checkout still queues invoices but nothing sends them.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// From address on invoice e-mails.
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Interval between outbox polls (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Entries sent per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Failed deliveries after which an entry is left alone.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_true() -> bool {
    true
}

fn default_sender() -> String {
    "invoices@sellpoint.local".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_batch_size() -> u32 {
    20
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for NotifierSettings {
    fn default() -> Self {
        NotifierSettings {
            enabled: true,
            sender: default_sender(),
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub notifier: NotifierSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `sellpoint.toml` in the platform
    ///    config directory). A missing file is not an error.
    /// 3. `SELLPOINT_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    ServiceError::config(format!("cannot read {}: {}", path.display(), e))
                })?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or falls back to defaults when loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> ServiceResult<Self> {
        toml::from_str(contents).map_err(|e| ServiceError::config(e.to_string()))
    }

    pub fn validate(&self) -> ServiceResult<()> {
        validate_tax_rate_bps(self.checkout.tax_rate_bps)
            .map_err(|e| ServiceError::config(e.to_string()))?;

        if self.checkout.low_stock_threshold < 0 {
            return Err(ServiceError::config("low_stock_threshold cannot be negative"));
        }

        if self.store.name.trim().is_empty() {
            return Err(ServiceError::config("store name is required"));
        }

        if self.database.max_connections == 0 {
            return Err(ServiceError::config("max_connections must be greater than 0"));
        }

        if self.notifier.enabled {
            validate_email(&self.notifier.sender)
                .map_err(|e| ServiceError::config(format!("notifier sender: {}", e)))?;

            if self.notifier.batch_size == 0 {
                return Err(ServiceError::config("batch_size must be greater than 0"));
            }
            if self.notifier.poll_interval_secs == 0 {
                return Err(ServiceError::config("poll_interval_secs must be greater than 0"));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `SELLPOINT_*` overrides read through `lookup`. Values that
    /// don't parse are ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("SELLPOINT_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(path) = lookup("SELLPOINT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("SELLPOINT_DB_MAX_CONNECTIONS") {
            match value.parse() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %value, "Ignoring invalid SELLPOINT_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("SELLPOINT_TAX_RATE_BPS") {
            match value.parse() {
                Ok(bps) => {
                    debug!(bps, "Overriding tax rate from environment");
                    self.checkout.tax_rate_bps = bps;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid SELLPOINT_TAX_RATE_BPS"),
            }
        }

        if let Some(value) = lookup("SELLPOINT_LOW_STOCK_THRESHOLD") {
            match value.parse() {
                Ok(threshold) => self.checkout.low_stock_threshold = threshold,
                Err(_) => warn!(value = %value, "Ignoring invalid SELLPOINT_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Some(value) = lookup("SELLPOINT_NOTIFIER_ENABLED") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.notifier.enabled = true,
                "0" | "false" | "no" | "off" => self.notifier.enabled = false,
                _ => warn!(value = %value, "Ignoring invalid SELLPOINT_NOTIFIER_ENABLED"),
            }
        }

        if let Some(sender) = lookup("SELLPOINT_NOTIFIER_SENDER") {
            self.notifier.sender = sender;
        }
    }

    /// `sellpoint.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "sellpoint", "sellpoint")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.checkout.tax_rate_bps)
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.checkout.low_stock_threshold
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.checkout.tax_rate_bps, 1900);
        assert_eq!(config.low_stock_threshold(), 10);
        assert!(config.notifier.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [store]
            name = "Downtown Electronics"

            [checkout]
            tax_rate_bps = 2100
            "#,
        )
        .unwrap();

        assert_eq!(config.store.name, "Downtown Electronics");
        assert_eq!(config.tax_rate().bps(), 2100);
        assert_eq!(config.checkout.low_stock_threshold, 10);
        assert_eq!(config.notifier.batch_size, 20);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SELLPOINT_TAX_RATE_BPS", "1000"),
            ("SELLPOINT_LOW_STOCK_THRESHOLD", "not-a-number"),
            ("SELLPOINT_NOTIFIER_ENABLED", "off"),
            ("SELLPOINT_DB_PATH", ":memory:"),
        ]);

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.checkout.tax_rate_bps, 1000);
        assert_eq!(config.checkout.low_stock_threshold, 10);
        assert!(!config.notifier.enabled);
        assert_eq!(config.database.path, PathBuf::from(":memory:"));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.checkout.tax_rate_bps = 12_000;
        assert!(matches!(config.validate(), Err(ServiceError::Config(_))));

        let mut config = AppConfig::default();
        config.notifier.sender = "not-an-email".to_string();
        assert!(config.validate().is_err());

        // A disabled notifier doesn't need a sender.
        config.notifier.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Some(PathBuf::from("/nonexistent/sellpoint.toml"))).unwrap();
        assert_eq!(config.store.name, "Sellpoint Store");
    }

    #[test]
    fn test_toml_round_trip_has_sections() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[checkout]"));
        assert!(toml_str.contains("[notifier]"));
    }
}
