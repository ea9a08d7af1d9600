use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The side of a held position. Unlike [`crate::signal::SignalSide`], a
/// position is never "flat" — a flat symbol is represented as `None` in
/// `position_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// The signal side that opens a position on this side.
    pub fn entry_side(self) -> crate::signal::SignalSide {
        match self {
            PositionSide::Long => crate::signal::SignalSide::Long,
            PositionSide::Short => crate::signal::SignalSide::Short,
        }
    }

    /// The signal side that closes a position on this side — the opposite of
    /// the entry side, per the exit-signal normalization in Design Notes.
    pub fn exit_side(self) -> crate::signal::SignalSide {
        match self {
            PositionSide::Long => crate::signal::SignalSide::Short,
            PositionSide::Short => crate::signal::SignalSide::Long,
        }
    }
}

/// An open position held by a strategy instance for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: Decimal,
    pub entry_ts: DateTime<Utc>,
    /// Free-form label for the regime the entry was taken under (e.g.
    /// "trend", "range"); used by regime-reversal exit rules.
    pub entry_regime: Option<String>,
}

impl Position {
    pub fn new(
        side: PositionSide,
        entry_price: Decimal,
        entry_ts: DateTime<Utc>,
        entry_regime: Option<String>,
    ) -> Self {
        Position {
            side,
            entry_price,
            entry_ts,
            entry_regime,
        }
    }

    pub fn held_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.entry_ts)
    }
}
