use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The direction of a trading signal. `Flat` denotes an exit; it always
/// carries the opposite side of the position being closed, plus a populated
/// `meta.exit_reason` (see [`Signal::exit`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSide {
    Long,
    Short,
    Flat,
}

impl SignalSide {
    /// Upper-cased form used for the catalog's `signal_type` column (4.3).
    pub fn as_signal_type(self) -> &'static str {
        match self {
            SignalSide::Long => "LONG",
            SignalSide::Short => "SHORT",
            SignalSide::Flat => "FLAT",
        }
    }
}

/// A trading instruction emitted by a strategy instance, destined for
/// persistence (C3), fan-out (C7), and execution forwarding (C6).
///
/// `idempotency_key` and `correlation_id` are generated at construction if
/// the builder leaves them unset (I3) — the same pair must then travel
/// unchanged through persistence, broadcast, and the execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub side: SignalSide,
    pub price: Decimal,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub meta: HashMap<String, String>,
    pub strategy_id: String,
    pub strategy_version: String,
    pub symbol: String,
    pub timeframe: String,
    pub idempotency_key: Uuid,
    pub correlation_id: Uuid,
}

impl Signal {
    /// Builds an entry signal (side must be `Long` or `Short`); fills in
    /// identity fields left blank by the strategy — callers overwrite
    /// `strategy_id`/`strategy_version`/`symbol`/`timeframe` during C5's
    /// enrichment step (4.5.9), so this constructor leaves them empty.
    pub fn entry(side: SignalSide, price: Decimal, confidence: f64) -> Self {
        Signal {
            side,
            price,
            confidence: confidence.clamp(0.0, 1.0),
            meta: HashMap::new(),
            strategy_id: String::new(),
            strategy_version: String::new(),
            symbol: String::new(),
            timeframe: String::new(),
            idempotency_key: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Builds an exit signal: `side` is the opposite of the position being
    /// closed and `meta.exit_reason` is always populated, per the
    /// `signal.side = "flat"` normalization in Design Notes.
    pub fn exit(side: SignalSide, price: Decimal, confidence: f64, exit_reason: impl Into<String>) -> Self {
        let mut signal = Signal::entry(side, price, confidence);
        signal.meta.insert("exit_reason".to_string(), exit_reason.into());
        signal
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// True once an instance has transitioned out of flat — an exit signal
    /// always carries a non-empty `exit_reason`.
    pub fn is_exit(&self) -> bool {
        self.meta.contains_key("exit_reason")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entry_generates_unique_keys() {
        let a = Signal::entry(SignalSide::Long, Decimal::from_str("100").unwrap(), 0.8);
        let b = Signal::entry(SignalSide::Long, Decimal::from_str("100").unwrap(), 0.8);
        assert_ne!(a.idempotency_key, b.idempotency_key);
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn confidence_is_clamped() {
        let signal = Signal::entry(SignalSide::Long, Decimal::from_str("1").unwrap(), 5.0);
        assert_eq!(signal.confidence, 1.0);
    }

    #[test]
    fn exit_signal_carries_reason_and_is_detected() {
        let signal = Signal::exit(
            SignalSide::Short,
            Decimal::from_str("99").unwrap(),
            0.5,
            "stop_loss",
        );
        assert!(signal.is_exit());
        assert_eq!(signal.meta.get("exit_reason").unwrap(), "stop_loss");
    }

    #[test]
    fn signal_type_is_upper_cased() {
        assert_eq!(SignalSide::Long.as_signal_type(), "LONG");
        assert_eq!(SignalSide::Flat.as_signal_type(), "FLAT");
    }
}
