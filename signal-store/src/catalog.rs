//! The shared catalog connection: schema, and the blocking `Connection`
//! opener every store wraps in `spawn_blocking`. Grounded on the teacher's
//! `SqliteLedgerRepository::connect` (WAL + synchronous=NORMAL pragmas,
//! parent-directory creation, `CREATE TABLE IF NOT EXISTS`).

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use signal_core::EngineError;

const CATALOG_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS instruments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS strategies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    params TEXT NOT NULL,
    symbols TEXT NOT NULL,
    timeframes TEXT NOT NULL,
    mode TEXT NOT NULL,
    is_live INTEGER NOT NULL,
    status TEXT NOT NULL,
    init_periods INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ohlcs (
    instrument_id INTEGER NOT NULL,
    timeframe TEXT NOT NULL,
    ts TEXT NOT NULL,
    open TEXT NOT NULL,
    high TEXT NOT NULL,
    low TEXT NOT NULL,
    close TEXT NOT NULL,
    volume TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS ohlcs_idx_instrument_tf_ts
    ON ohlcs(instrument_id, timeframe, ts);

CREATE TABLE IF NOT EXISTS ohlc_imports (
    instrument_id INTEGER NOT NULL,
    timeframe TEXT NOT NULL,
    ts TEXT NOT NULL,
    open TEXT NOT NULL,
    high TEXT NOT NULL,
    low TEXT NOT NULL,
    close TEXT NOT NULL,
    volume TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS ohlc_imports_idx_instrument_tf_ts
    ON ohlc_imports(instrument_id, timeframe, ts);

CREATE TABLE IF NOT EXISTS signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exchange_id INTEGER NOT NULL,
    instrument_id INTEGER NOT NULL,
    strategy_id TEXT NOT NULL,
    strategy_version TEXT NOT NULL,
    signal_type TEXT NOT NULL,
    signal_value TEXT NOT NULL,
    confidence REAL NOT NULL,
    payload TEXT,
    mode TEXT NOT NULL,
    idempotency_key TEXT NOT NULL UNIQUE,
    correlation_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS signals_idx_instrument_strategy
    ON signals(instrument_id, strategy_id);
"#;

/// Opens and, on first use, initializes the shared sqlite catalog file.
#[derive(Clone, Debug)]
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let catalog = Catalog { path: path.into() };
        catalog
            .connect()
            .and_then(|conn| {
                conn.execute_batch(CATALOG_SCHEMA)
                    .map_err(|err| EngineError::CatalogInit(err.to_string()))
            })
            .map_err(|err| EngineError::CatalogInit(err.to_string()))?;
        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection, EngineError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|err| EngineError::CatalogInit(err.to_string()))?;
            }
        }
        let conn = Connection::open(&self.path)
            .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;
        Ok(conn)
    }
}
