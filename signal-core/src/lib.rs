//! Domain types shared across the Signal Engine Core runtime: candles,
//! signals, strategy configuration, position state, timestamp normalization,
//! and the engine-wide error enum. No crate in this workspace should
//! redefine these shapes.

mod candle;
mod error;
mod position;
mod signal;
mod strategy_config;
pub mod timestamp;

pub use candle::{decimal_to_f64, Candle, HistoryBar};
pub use error::EngineError;
pub use position::{Position, PositionSide};
pub use signal::{Signal, SignalSide};
pub use strategy_config::{StrategyConfig, StrategyStatus, TradingMode};

/// Builds the `strategy:symbol:timeframe` composite key used by the engine's
/// `last_candle_ts` / `warmup_*` bookkeeping maps (§3).
pub fn strategy_symbol_timeframe_key(strategy_id: &str, symbol: &str, timeframe: &str) -> String {
    format!("{strategy_id}:{symbol}:{timeframe}")
}

/// Builds the `strategy:symbol` composite key used by the `last_signal_ts`
/// cooldown map (§3).
pub fn strategy_symbol_key(strategy_id: &str, symbol: &str) -> String {
    format!("{strategy_id}:{symbol}")
}

/// Builds the `symbol:timeframe` composite key used by `startup_latest_ts`.
pub fn symbol_timeframe_key(symbol: &str, timeframe: &str) -> String {
    format!("{symbol}:{timeframe}")
}
