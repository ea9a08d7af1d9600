//! Built-in indicator implementations.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;

pub use atr::Atr;
pub use bollinger::{BollingerBands, BollingerBandsOutput};
pub use ema::Ema;
pub use rsi::Rsi;
pub use sma::Sma;
