//! Environment-sourced configuration (§6: "Configuration"), the ambient
//! concern the distilled spec's Non-goals exclude only as far as CLI
//! argument parsing — loading itself still belongs here, the way the
//! teacher's `tesser-config` wraps the `config` crate rather than reading
//! `std::env` directly.

use std::str::FromStr;

use config::{Environment, Source};
use serde::Deserialize;
use signal_core::TradingMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid trading_mode: {0}")]
    InvalidTradingMode(String),
}

/// Raw, string-typed shape the `config` crate deserializes into before
/// `trading_mode` is parsed into [`TradingMode`] and `signalservice_port`
/// is range-checked.
#[derive(Debug, Deserialize)]
struct RawConfig {
    database_url: String,
    dataservice_addr: String,
    signalservice_port: u16,
    executionservice_addr: String,
    trading_mode: String,
    signal_cooldown_minutes: i64,
}

/// The resolved configuration every `signal-service` component is wired
/// from (§6).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub dataservice_addr: String,
    pub signalservice_port: u16,
    pub executionservice_addr: String,
    pub trading_mode: TradingMode,
    pub signal_cooldown_minutes: i64,
}

impl Config {
    /// Loads configuration from process environment variables (uppercase,
    /// per the variable names in §6), falling back to the defaults below
    /// for anything unset. `trading_mode` defaults to `"live"` exactly as
    /// specified, even though most development setups will want to
    /// override it to `paper`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    fn load(source: impl Source + Send + Sync + 'static) -> Result<Self, ConfigError> {
        let raw = config::Config::builder()
            .set_default("database_url", "sqlite://signal-engine.db")?
            .set_default("dataservice_addr", "http://127.0.0.1:50051")?
            .set_default("signalservice_port", 50053)?
            .set_default("executionservice_addr", "http://127.0.0.1:50052")?
            .set_default("trading_mode", "live")?
            .set_default("signal_cooldown_minutes", 15)?
            .add_source(source)
            .build()?
            .try_deserialize::<RawConfig>()?;

        let trading_mode = TradingMode::from_str(&raw.trading_mode.to_ascii_lowercase())
            .map_err(|_| ConfigError::InvalidTradingMode(raw.trading_mode.clone()))?;

        Ok(Config {
            database_url: raw.database_url,
            dataservice_addr: raw.dataservice_addr,
            signalservice_port: raw.signalservice_port,
            executionservice_addr: raw.executionservice_addr,
            trading_mode,
            signal_cooldown_minutes: raw.signal_cooldown_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> Result<Config, ConfigError> {
        Config::load(File::from_str(toml, FileFormat::Toml))
    }

    #[test]
    fn defaults_apply_when_source_is_empty() {
        let config = from_toml("").unwrap();
        assert_eq!(config.signal_cooldown_minutes, 15);
        assert_eq!(config.trading_mode, TradingMode::Live);
        assert_eq!(config.signalservice_port, 50053);
    }

    #[test]
    fn source_overrides_defaults() {
        let config = from_toml(
            r#"
            trading_mode = "PAPER"
            signal_cooldown_minutes = 30
            signalservice_port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.trading_mode, TradingMode::Paper);
        assert_eq!(config.signal_cooldown_minutes, 30);
        assert_eq!(config.signalservice_port, 9000);
    }

    #[test]
    fn rejects_unrecognized_trading_mode() {
        let err = from_toml(r#"trading_mode = "bogus""#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTradingMode(_)));
    }
}
