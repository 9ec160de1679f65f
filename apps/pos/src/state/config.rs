//! # Configuration State
//!
//! Stores application configuration loaded at startup.
//!
//! ## Configuration Sources (later overrides earlier)
//! 1. Defaults (this file)
//! 2. Config file (`otica.toml` in the platform config dir, or `OTICA_CONFIG`)
//! 3. Environment variables (`OTICA_*`)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use otica_core::{Money, DEFAULT_QUOTE_VALIDITY_DAYS, DEFAULT_SEARCH_LIMIT, OS_DELIVERY_DAYS};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Name of the config file looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "otica.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Could not parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store whose inventory, sales and service orders are used
    pub store_id: String,

    /// Store name (displayed on the counter screen)
    pub store_name: String,

    /// Seller recorded on every finalized transaction
    pub seller_name: String,

    /// Days a quote stays valid after it is saved
    pub quote_validity_days: i64,

    /// Days between OS creation and the default delivery date
    pub os_delivery_days: i64,

    /// Maximum rows returned by product and client lookups
    pub search_limit: usize,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Database file override; the platform data dir is used when unset
    pub db_path: Option<PathBuf>,

    /// Blob directory override; `{data dir}/blobs` is used when unset
    pub blob_dir: Option<PathBuf>,
}

/// What `otica.toml` may set. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    store_id: Option<String>,
    store_name: Option<String>,
    seller_name: Option<String>,
    quote_validity_days: Option<i64>,
    os_delivery_days: Option<i64>,
    search_limit: Option<usize>,
    currency_symbol: Option<String>,
    db_path: Option<PathBuf>,
    blob_dir: Option<PathBuf>,
}

impl Default for ConfigState {
    /// Returns default configuration suitable for development.
    fn default() -> Self {
        ConfigState {
            store_id: "loja-01".to_string(),
            store_name: "Ótica Dev".to_string(),
            seller_name: "Balcão".to_string(),
            quote_validity_days: DEFAULT_QUOTE_VALIDITY_DAYS,
            os_delivery_days: OS_DELIVERY_DAYS,
            search_limit: DEFAULT_SEARCH_LIMIT,
            currency_symbol: "R$".to_string(),
            db_path: None,
            blob_dir: None,
        }
    }
}

impl ConfigState {
    /// Loads configuration from every source.
    ///
    /// ## Arguments
    /// * `file` - Explicit config file; when `None`, `OTICA_CONFIG` and then
    ///   the platform config dir are tried. A missing default file is fine.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = ConfigState::default();

        let explicit = file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("OTICA_CONFIG").map(PathBuf::from));

        match explicit {
            Some(path) => config.apply_file(&path)?,
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    config.apply_file(&path)?;
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Creates a ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `OTICA_STORE_ID`, `OTICA_STORE_NAME`, `OTICA_SELLER_NAME`
    /// - `OTICA_QUOTE_VALIDITY_DAYS`
    /// - `OTICA_DB_PATH`, `OTICA_BLOB_DIR`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ConfigState::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        debug!(path = %path.display(), "Reading config file");
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.apply_toml(&raw).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Overlays the keys present in a TOML document.
    fn apply_toml(&mut self, raw: &str) -> Result<(), String> {
        let file: ConfigFile = toml::from_str(raw).map_err(|e| e.to_string())?;

        if let Some(v) = file.store_id {
            self.store_id = v;
        }
        if let Some(v) = file.store_name {
            self.store_name = v;
        }
        if let Some(v) = file.seller_name {
            self.seller_name = v;
        }
        if let Some(v) = file.quote_validity_days {
            self.quote_validity_days = v;
        }
        if let Some(v) = file.os_delivery_days {
            self.os_delivery_days = v;
        }
        if let Some(v) = file.search_limit {
            self.search_limit = v;
        }
        if let Some(v) = file.currency_symbol {
            self.currency_symbol = v;
        }
        if file.db_path.is_some() {
            self.db_path = file.db_path;
        }
        if file.blob_dir.is_some() {
            self.blob_dir = file.blob_dir;
        }
        Ok(())
    }

    /// Overlays `OTICA_*` variables read through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = var("OTICA_STORE_ID") {
            self.store_id = v;
        }
        if let Some(v) = var("OTICA_STORE_NAME") {
            self.store_name = v;
        }
        if let Some(v) = var("OTICA_SELLER_NAME") {
            self.seller_name = v;
        }
        if let Some(v) = var("OTICA_QUOTE_VALIDITY_DAYS") {
            self.quote_validity_days = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("OTICA_QUOTE_VALIDITY_DAYS".to_string()))?;
        }
        if let Some(v) = var("OTICA_DB_PATH") {
            self.db_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("OTICA_BLOB_DIR") {
            self.blob_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Rejects values the rest of the app cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("store_id".to_string()));
        }
        if self.seller_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("seller_name".to_string()));
        }
        if self.quote_validity_days < 1 {
            return Err(ConfigError::InvalidValue("quote_validity_days".to_string()));
        }
        if self.os_delivery_days < 0 {
            return Err(ConfigError::InvalidValue("os_delivery_days".to_string()));
        }
        if self.search_limit < 1 {
            return Err(ConfigError::InvalidValue("search_limit".to_string()));
        }
        Ok(())
    }

    /// Formats a centavo amount for display.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(123456), "R$ 1.234,56");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        Money::from_cents(cents).format_with(&self.currency_symbol)
    }
}

/// `otica.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("br", "otica", "pos").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ConfigState::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quote_validity_days, 7);
        assert_eq!(config.os_delivery_days, 15);
        assert_eq!(config.search_limit, 10);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let mut config = ConfigState::default();
        config
            .apply_toml(
                r#"
                store_id = "loja-centro"
                seller_name = "Joana"
                search_limit = 25
                db_path = "/var/lib/otica/otica.db"
                "#,
            )
            .unwrap();

        assert_eq!(config.store_id, "loja-centro");
        assert_eq!(config.seller_name, "Joana");
        assert_eq!(config.search_limit, 25);
        assert_eq!(config.db_path, Some(PathBuf::from("/var/lib/otica/otica.db")));
        assert_eq!(config.quote_validity_days, 7);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let mut config = ConfigState::default();
        assert!(config.apply_toml("tax_rate = 8.25").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ConfigState::default();
        config.apply_toml(r#"store_id = "loja-centro""#).unwrap();
        config
            .apply_env(env(&[
                ("OTICA_STORE_ID", "loja-norte"),
                ("OTICA_QUOTE_VALIDITY_DAYS", "30"),
                ("OTICA_BLOB_DIR", "/tmp/fotos"),
            ]))
            .unwrap();

        assert_eq!(config.store_id, "loja-norte");
        assert_eq!(config.quote_validity_days, 30);
        assert_eq!(config.blob_dir, Some(PathBuf::from("/tmp/fotos")));
    }

    #[test]
    fn test_env_rejects_bad_number() {
        let mut config = ConfigState::default();
        let result = config.apply_env(env(&[("OTICA_QUOTE_VALIDITY_DAYS", "sete")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validate_rejects_empty_store_and_zero_validity() {
        let mut config = ConfigState::default();
        config.store_id = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = ConfigState::default();
        config.quote_validity_days = 0;
        assert!(config.validate().is_err());

        let mut config = ConfigState::default();
        config.search_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_seller() {
        let mut config = ConfigState::default();
        config.apply_env(env(&[("OTICA_SELLER_NAME", "")])).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(field)) if field == "seller_name"
        ));
    }

    #[test]
    fn test_format_currency() {
        let config = ConfigState::default();
        assert_eq!(config.format_currency(123456), "R$ 1.234,56");
        assert_eq!(config.format_currency(5), "R$ 0,05");
        assert_eq!(config.format_currency(-1000), "-R$ 10,00");
    }
}
