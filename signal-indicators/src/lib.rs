#![doc = include_str!("../README.md")]

//! Composable technical indicators used by the built-in reference strategies.

/// Indicator composition helpers such as `PipedIndicator`.
pub mod combinators;
/// Foundational traits and shared abstractions.
pub mod core;
/// Built-in indicator implementations.
pub mod indicators;

pub use crate::combinators::PipedIndicator;
pub use crate::core::{Indicator, IndicatorError, Input};
pub use crate::indicators::{Atr, BollingerBands, BollingerBandsOutput, Ema, Rsi, Sma};
