//! Built-in reference strategies. Each pairs a [`crate::logic::StrategyLogic`]
//! implementation with a `register_strategy!` invocation so it is available
//! to the catalog-driven registry without any central wiring.

pub mod bollinger_breakout;
pub mod params;
pub mod rsi_reversion;
pub mod sma_cross;

pub use bollinger_breakout::BollingerBreakout;
pub use rsi_reversion::RsiReversion;
pub use sma_cross::SmaCross;
