//! C5's bookkeeping maps (§3): de-duplication, cooldown, and the startup
//! gate's latest-known-bar cutoffs. All three are long-lived across
//! `reload_strategies()` calls — only `warmup_required`/`warmup_complete`
//! are rebuilt wholesale with the instance list (see [`crate::engine::EngineState`]).
//!
//! Per §5, these maps "MUST be accessed under a single mutex or be split
//! into per-key shards" since `process_candle` may be entered concurrently
//! across timeframes. A single `parking_lot::Mutex` is used here: every gate
//! check is a plain map lookup/insert, never an await point, so lock
//! contention is brief even under concurrent per-timeframe tasks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Default)]
struct BookkeepingState {
    last_candle_ts: HashMap<String, DateTime<Utc>>,
    last_signal_ts: HashMap<String, DateTime<Utc>>,
    startup_latest_ts: HashMap<String, DateTime<Utc>>,
}

/// The engine-wide gate state, shared (not per-reload) across the life of a
/// `StrategyEngine`.
#[derive(Default)]
pub struct Bookkeeping {
    state: Mutex<BookkeepingState>,
}

impl Bookkeeping {
    pub fn new() -> Self {
        Bookkeeping::default()
    }

    /// Startup gate (I5): `true` once `ts` is at or before the recorded
    /// latest bar the catalog held for `(symbol, timeframe)` at boot.
    pub fn startup_rejects(&self, key: &str, ts: DateTime<Utc>) -> bool {
        let state = self.state.lock();
        matches!(state.startup_latest_ts.get(key), Some(cutoff) if ts <= *cutoff)
    }

    pub fn set_startup_latest_ts(&self, key: String, ts: DateTime<Utc>) {
        self.state.lock().startup_latest_ts.insert(key, ts);
    }

    /// De-duplication gate (I4): `true` (reject) when `ts` does not move
    /// the composite key's watermark strictly forward. On acceptance the
    /// watermark is advanced in the same critical section.
    pub fn dedup_gate(&self, key: &str, ts: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        if let Some(last) = state.last_candle_ts.get(key) {
            if ts <= *last {
                return true;
            }
        }
        state.last_candle_ts.insert(key.to_string(), ts);
        false
    }

    /// Cooldown gate: `true` (reject) when fewer than `cooldown` has
    /// elapsed since the last emission for this `(strategy, symbol)`.
    pub fn cooldown_rejects(&self, key: &str, now: DateTime<Utc>, cooldown: chrono::Duration) -> bool {
        let state = self.state.lock();
        matches!(state.last_signal_ts.get(key), Some(last) if now - *last < cooldown)
    }

    pub fn record_signal(&self, key: String, now: DateTime<Utc>) {
        self.state.lock().last_signal_ts.insert(key, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn dedup_gate_rejects_non_increasing_timestamps() {
        let book = Bookkeeping::new();
        let t0 = Utc::now();
        assert!(!book.dedup_gate("k", t0));
        assert!(book.dedup_gate("k", t0));
        assert!(!book.dedup_gate("k", t0 + Duration::seconds(1)));
    }

    #[test]
    fn startup_gate_rejects_at_or_before_cutoff() {
        let book = Bookkeeping::new();
        let cutoff = Utc::now();
        book.set_startup_latest_ts("k".to_string(), cutoff);
        assert!(book.startup_rejects("k", cutoff));
        assert!(book.startup_rejects("k", cutoff - Duration::seconds(1)));
        assert!(!book.startup_rejects("k", cutoff + Duration::seconds(1)));
    }

    #[test]
    fn cooldown_rejects_within_window() {
        let book = Bookkeeping::new();
        let t0 = Utc::now();
        book.record_signal("k".to_string(), t0);
        assert!(book.cooldown_rejects("k", t0 + Duration::minutes(1), Duration::minutes(15)));
        assert!(!book.cooldown_rejects("k", t0 + Duration::minutes(16), Duration::minutes(15)));
    }
}
