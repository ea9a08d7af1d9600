//! Foundational trait and error type shared by every indicator.

use thiserror::Error;

/// Errors raised while constructing an indicator. Indicators never fail
/// once built — bad input periods/parameters are rejected at construction.
#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("{indicator}: period must be non-zero, got {period}")]
    InvalidPeriod { indicator: &'static str, period: usize },

    #[error("{indicator}: parameter {name} is invalid (got {value})")]
    InvalidParameter {
        indicator: &'static str,
        name: &'static str,
        value: f64,
    },
}

impl IndicatorError {
    pub fn invalid_period(indicator: &'static str, period: usize) -> Self {
        IndicatorError::InvalidPeriod { indicator, period }
    }

    pub fn invalid_parameter(indicator: &'static str, name: &'static str, value: f64) -> Self {
        IndicatorError::InvalidParameter {
            indicator,
            name,
            value,
        }
    }
}

/// A streaming, stateful computation over a series of inputs. `next` is
/// called once per bar; `None` means the indicator is still warming up.
pub trait Indicator {
    type Input;
    type Output;

    fn next(&mut self, input: Self::Input) -> Option<Self::Output>;

    /// Clears all internal state, as if the indicator had just been created.
    fn reset(&mut self);
}

/// A type an indicator can extract a single scalar value from. Implemented
/// for `f64` directly so indicators can also be fed closing prices, and for
/// [`signal_core::HistoryBar`] so ATR-style indicators can read the full bar.
pub trait Input {
    fn value(&self) -> f64;
}

impl Input for f64 {
    fn value(&self) -> f64 {
        *self
    }
}

impl Input for signal_core::HistoryBar {
    fn value(&self) -> f64 {
        self.close
    }
}
