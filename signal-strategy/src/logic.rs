//! The narrow per-strategy contract. Concrete strategies implement
//! [`StrategyLogic`] and get the shared scaffolding (insufficient-data
//! guard, session filter, position discipline) from [`crate::instance::StrategyInstance`]
//! for free — see §4.4.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use signal_core::{Candle, EngineError, HistoryBar, Position, PositionSide, StrategyConfig};

/// An entry decision returned from [`StrategyLogic::evaluate_entry`].
pub struct EntryDecision {
    pub side: PositionSide,
    pub price: Decimal,
    pub confidence: f64,
}

/// An exit decision returned from [`StrategyLogic::evaluate_exit`].
pub struct ExitDecision {
    pub price: Decimal,
    pub confidence: f64,
    pub reason: String,
}

/// The per-strategy "formula". Everything here is domain trivia — the
/// scaffolding behaviors required by §4.4 (warmup, session, position
/// discipline) live in [`crate::instance::StrategyInstance`], not here.
pub trait StrategyLogic: Send + Sync + 'static {
    /// Builds the logic's mutable state from a catalog row's `params`.
    fn build(config: &StrategyConfig) -> Result<Self, EngineError>
    where
        Self: Sized;

    /// Minimum history length required before this strategy will evaluate.
    fn min_bars(&self) -> usize;

    /// Optional UTC wall-clock session window; outside it, candles are
    /// skipped by the shared session filter.
    fn session(&self) -> Option<(NaiveTime, NaiveTime)> {
        None
    }

    /// Called only when the symbol is currently flat. Returning `Some`
    /// opens a position.
    fn evaluate_entry(&mut self, candle: &Candle, history: &[HistoryBar]) -> Option<EntryDecision>;

    /// Called only when the symbol is currently in-position. Returning
    /// `Some` closes it.
    fn evaluate_exit(
        &mut self,
        candle: &Candle,
        history: &[HistoryBar],
        position: &Position,
    ) -> Option<ExitDecision>;
}
