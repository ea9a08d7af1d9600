use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// `paper` never forwards to the live execution endpoint semantics are left
/// to the execution service; the engine only tags signals with the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
}

impl TradingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TradingMode::Paper => "paper",
            TradingMode::Live => "live",
        }
    }
}

impl std::str::FromStr for TradingMode {
    type Err = crate::error::EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "paper" => Ok(TradingMode::Paper),
            "live" => Ok(TradingMode::Live),
            other => Err(crate::error::EngineError::CatalogInit(format!(
                "unrecognized trading mode: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    Active,
    Inactive,
}

/// A catalog row describing one configured strategy instance (3: StrategyConfig).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    /// Arbitrary strategy parameters, stored as a JSON object in the catalog.
    pub params: Value,
    pub symbols: Vec<String>,
    pub timeframes: Vec<String>,
    pub mode: TradingMode,
    pub init_periods: u32,
    pub status: StrategyStatus,
    pub is_live: bool,
}

impl StrategyConfig {
    pub fn is_active(&self) -> bool {
        self.status == StrategyStatus::Active
    }

    /// Composite identity string used to key engine bookkeeping maps.
    pub fn instance_key(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trading_mode_case_insensitively() {
        use std::str::FromStr;
        assert_eq!(TradingMode::from_str("LIVE").unwrap(), TradingMode::Live);
        assert_eq!(TradingMode::from_str("paper").unwrap(), TradingMode::Paper);
        assert!(TradingMode::from_str("bogus").is_err());
    }

    #[test]
    fn instance_key_combines_name_and_version() {
        let config = StrategyConfig {
            id: Uuid::new_v4(),
            name: "sma-cross".to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({}),
            symbols: vec!["BTCUSDT".to_string()],
            timeframes: vec!["5m".to_string()],
            mode: TradingMode::Paper,
            init_periods: 50,
            status: StrategyStatus::Active,
            is_live: false,
        };
        assert_eq!(config.instance_key(), "sma-cross:1.0.0");
        assert!(config.is_active());
    }
}
