//! Signal Store (C3): resolves `symbol -> instrument_id`, and atomically
//! inserts one row per persisted signal. An unresolvable symbol is a
//! logged, non-fatal drop — not an error (§4.3, §7).

use rusqlite::{params, Connection, OptionalExtension};
use signal_core::{EngineError, Signal, TradingMode};
use tracing::warn;

use crate::catalog::Catalog;

/// Catalog-backed implementation of C3.
#[derive(Clone)]
pub struct SignalStore {
    catalog: Catalog,
}

impl SignalStore {
    pub fn new(catalog: Catalog) -> Self {
        SignalStore { catalog }
    }

    /// Persists `signal` as a single atomic write (I2). Returns `Ok(())`
    /// even when the symbol has no catalog entry — that case is a logged
    /// drop, not a failure, per §4.3/§7.
    pub async fn persist(&self, signal: Signal, mode: TradingMode) -> Result<(), EngineError> {
        let catalog = self.catalog.clone();
        tokio::task::spawn_blocking(move || persist_blocking(&catalog, &signal, mode))
            .await
            .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?
    }
}

fn persist_blocking(catalog: &Catalog, signal: &Signal, mode: TradingMode) -> Result<(), EngineError> {
    let mut conn = catalog.connect()?;
    let instrument_id = match resolve_instrument(&conn, &signal.symbol)? {
        Some(id) => id,
        None => {
            warn!(symbol = %signal.symbol, "unknown instrument, dropping signal");
            return Ok(());
        }
    };

    let tx = conn
        .transaction()
        .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;
    tx.execute(
        "INSERT INTO signals (
            exchange_id, instrument_id, strategy_id, strategy_version,
            signal_type, signal_value, confidence, payload, mode,
            idempotency_key, correlation_id, created_at
         ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            instrument_id,
            signal.strategy_id,
            signal.strategy_version,
            signal.side.as_signal_type(),
            signal.price.to_string(),
            signal.confidence,
            serde_json::to_string(&signal.meta).unwrap_or_default(),
            mode.as_str(),
            signal.idempotency_key.to_string(),
            signal.correlation_id.to_string(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;
    tx.commit()
        .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;
    Ok(())
}

fn resolve_instrument(conn: &Connection, symbol: &str) -> Result<Option<i64>, EngineError> {
    conn.query_row(
        "SELECT id FROM instruments WHERE symbol = ?1",
        params![symbol],
        |row| row.get(0),
    )
    .optional()
    .map_err(|err| EngineError::StoreUnavailable(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use signal_core::SignalSide;
    use std::str::FromStr;

    #[tokio::test]
    async fn persists_signal_for_known_instrument() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("catalog.db")).unwrap();
        {
            let conn = catalog.connect().unwrap();
            conn.execute("INSERT INTO instruments (symbol) VALUES ('BTCUSDT')", [])
                .unwrap();
        }

        let store = SignalStore::new(catalog.clone());
        let mut signal = Signal::entry(SignalSide::Long, Decimal::from_str("100").unwrap(), 0.8);
        signal.strategy_id = "sma-cross".to_string();
        signal.strategy_version = "1.0.0".to_string();
        signal.symbol = "BTCUSDT".to_string();
        signal.timeframe = "5m".to_string();

        store.persist(signal.clone(), TradingMode::Paper).await.unwrap();

        let conn = catalog.connect().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM signals WHERE idempotency_key = ?1",
                params![signal.idempotency_key.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn drops_signal_for_unknown_instrument_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("catalog.db")).unwrap();
        let store = SignalStore::new(catalog.clone());

        let mut signal = Signal::entry(SignalSide::Long, Decimal::from_str("100").unwrap(), 0.8);
        signal.symbol = "NOPE".to_string();

        store.persist(signal, TradingMode::Paper).await.unwrap();

        let conn = catalog.connect().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM signals", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
    }
}
