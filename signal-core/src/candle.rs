use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV bar for a `(symbol, timeframe)` pair, as received from the
/// upstream candle producer. `timestamp` is the result of normalizing the
/// wire's heterogeneous timestamp shapes in [`crate::timestamp`] — `None`
/// when that normalization failed (§4.5 gate 2: "Unparseable -> treat as
/// `null`"). A candle with no timestamp still routes through the engine; it
/// only skips the gates that require one (session, startup, de-duplication).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub count: i64,
}

impl Candle {
    pub fn composite_key(&self, strategy_id: &str) -> String {
        format!("{strategy_id}:{}:{}", self.symbol, self.timeframe)
    }
}

/// A single bar of strategy-facing history: the same shape as [`Candle`] but
/// with numeric columns coerced to `f64`, per the contract in 4.4 ("numeric
/// columns already coerced to floating point"). This is what `on_candle`
/// receives in its `history` slice; it is never mutated by strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub count: i64,
}

impl From<&Candle> for HistoryBar {
    /// Bars reaching this conversion always come back from the History Store
    /// (C2), whose rows always carry a real timestamp — `unwrap_or_else` is a
    /// type-level fallback, never a path a store-backed bar actually takes.
    fn from(candle: &Candle) -> Self {
        HistoryBar {
            timestamp: candle.timestamp.unwrap_or_else(Utc::now),
            open: decimal_to_f64(candle.open),
            high: decimal_to_f64(candle.high),
            low: decimal_to_f64(candle.low),
            close: decimal_to_f64(candle.close),
            volume: decimal_to_f64(candle.volume),
            count: candle.count,
        }
    }
}

/// The one sanctioned `Decimal` -> `f64` boundary (§4.4: "numeric columns
/// already coerced to floating point"). Strategies convert `Candle`/`Position`
/// decimal fields through this rather than round-tripping through a string.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_candle() -> Candle {
        Candle {
            symbol: "BTCUSDT".to_string(),
            timeframe: "5m".to_string(),
            timestamp: Some(Utc::now()),
            open: Decimal::from_str("100.5").unwrap(),
            high: Decimal::from_str("101.0").unwrap(),
            low: Decimal::from_str("99.5").unwrap(),
            close: Decimal::from_str("100.75").unwrap(),
            volume: Decimal::from_str("12.25").unwrap(),
            count: 42,
        }
    }

    #[test]
    fn history_bar_coerces_to_float() {
        let candle = sample_candle();
        let bar = HistoryBar::from(&candle);
        assert!((bar.close - 100.75).abs() < f64::EPSILON);
        assert_eq!(bar.count, 42);
    }

    #[test]
    fn composite_key_formats_strategy_symbol_timeframe() {
        let candle = sample_candle();
        assert_eq!(candle.composite_key("sma-cross"), "sma-cross:BTCUSDT:5m");
    }

    #[test]
    fn history_bar_falls_back_to_now_when_candle_timestamp_is_none() {
        let mut candle = sample_candle();
        candle.timestamp = None;
        let before = Utc::now();
        let bar = HistoryBar::from(&candle);
        assert!(bar.timestamp >= before);
    }
}
