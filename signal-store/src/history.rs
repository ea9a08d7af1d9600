//! History Store (C2): `fetch(symbol, timeframe, bars, source)` returning the
//! most recent bars ascending by timestamp, falling back from `imported` to
//! `primary` when the former yields nothing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use signal_core::{Candle, EngineError};
use tracing::warn;

use crate::catalog::Catalog;

/// Which OHLC table to read from, per §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarSource {
    Primary,
    Imported,
}

impl BarSource {
    fn table(self) -> &'static str {
        match self {
            BarSource::Primary => "ohlcs",
            BarSource::Imported => "ohlc_imports",
        }
    }
}

/// Catalog-backed implementation of C2.
#[derive(Clone)]
pub struct HistoryStore {
    catalog: Catalog,
}

impl HistoryStore {
    pub fn new(catalog: Catalog) -> Self {
        HistoryStore { catalog }
    }

    /// Returns up to `bars` most recent bars for `(symbol, timeframe)`,
    /// ascending by timestamp. Falls back from `imported` to `primary` when
    /// the imported table has no rows for this key (§4.2).
    pub async fn fetch(
        &self,
        symbol: String,
        timeframe: String,
        bars: usize,
        source: BarSource,
    ) -> Result<Vec<Candle>, EngineError> {
        let catalog = self.catalog.clone();
        tokio::task::spawn_blocking(move || fetch_blocking(&catalog, &symbol, &timeframe, bars, source))
            .await
            .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?
    }

    /// Reads `max(ts)` across both OHLC tables for `(symbol, timeframe)`,
    /// used to populate `startup_latest_ts` during `initialize()` (4.5.3).
    pub async fn max_timestamp(
        &self,
        symbol: String,
        timeframe: String,
    ) -> Result<Option<DateTime<Utc>>, EngineError> {
        let catalog = self.catalog.clone();
        tokio::task::spawn_blocking(move || max_timestamp_blocking(&catalog, &symbol, &timeframe))
            .await
            .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?
    }
}

fn fetch_blocking(
    catalog: &Catalog,
    symbol: &str,
    timeframe: &str,
    bars: usize,
    source: BarSource,
) -> Result<Vec<Candle>, EngineError> {
    let conn = catalog.connect()?;
    let primary = read_bars(&conn, symbol, timeframe, bars, BarSource::Primary.table())?;

    if source == BarSource::Primary {
        return Ok(primary);
    }

    let imported = read_bars(&conn, symbol, timeframe, bars, BarSource::Imported.table())?;
    if imported.is_empty() {
        warn!(symbol, timeframe, "imported source empty, falling back to primary");
        Ok(primary)
    } else {
        Ok(imported)
    }
}

fn read_bars(
    conn: &Connection,
    symbol: &str,
    timeframe: &str,
    bars: usize,
    table: &str,
) -> Result<Vec<Candle>, EngineError> {
    let sql = format!(
        "SELECT o.ts, o.open, o.high, o.low, o.close, o.volume, o.count
         FROM {table} o
         JOIN instruments i ON i.id = o.instrument_id
         WHERE i.symbol = ?1 AND o.timeframe = ?2
         ORDER BY o.ts DESC
         LIMIT ?3"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;
    let mut rows = stmt
        .query(params![symbol, timeframe, bars as i64])
        .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;

    let mut candles = Vec::with_capacity(bars);
    while let Some(row) = rows
        .next()
        .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?
    {
        candles.push(row_to_candle(row, symbol, timeframe)?);
    }
    candles.reverse();
    Ok(candles)
}

fn row_to_candle(row: &rusqlite::Row<'_>, symbol: &str, timeframe: &str) -> Result<Candle, EngineError> {
    let parse_err = |err: String| EngineError::StoreUnavailable(format!("corrupt catalog row: {err}"));

    let ts_str: String = row.get(0).map_err(|e| parse_err(e.to_string()))?;
    let open: String = row.get(1).map_err(|e| parse_err(e.to_string()))?;
    let high: String = row.get(2).map_err(|e| parse_err(e.to_string()))?;
    let low: String = row.get(3).map_err(|e| parse_err(e.to_string()))?;
    let close: String = row.get(4).map_err(|e| parse_err(e.to_string()))?;
    let volume: String = row.get(5).map_err(|e| parse_err(e.to_string()))?;
    let count: i64 = row.get(6).map_err(|e| parse_err(e.to_string()))?;

    let timestamp = DateTime::parse_from_rfc3339(&ts_str)
        .map_err(|err| parse_err(err.to_string()))?
        .with_timezone(&Utc);

    Ok(Candle {
        symbol: symbol.to_string(),
        timeframe: timeframe.to_string(),
        timestamp: Some(timestamp),
        open: Decimal::from_str(&open).map_err(|e| parse_err(e.to_string()))?,
        high: Decimal::from_str(&high).map_err(|e| parse_err(e.to_string()))?,
        low: Decimal::from_str(&low).map_err(|e| parse_err(e.to_string()))?,
        close: Decimal::from_str(&close).map_err(|e| parse_err(e.to_string()))?,
        volume: Decimal::from_str(&volume).map_err(|e| parse_err(e.to_string()))?,
        count,
    })
}

fn max_timestamp_blocking(
    catalog: &Catalog,
    symbol: &str,
    timeframe: &str,
) -> Result<Option<DateTime<Utc>>, EngineError> {
    let conn = catalog.connect()?;
    let sql = "SELECT MAX(ts) FROM (
                   SELECT o.ts FROM ohlcs o JOIN instruments i ON i.id = o.instrument_id
                   WHERE i.symbol = ?1 AND o.timeframe = ?2
                   UNION ALL
                   SELECT o.ts FROM ohlc_imports o JOIN instruments i ON i.id = o.instrument_id
                   WHERE i.symbol = ?1 AND o.timeframe = ?2
               )";
    let ts: Option<String> = conn
        .query_row(sql, params![symbol, timeframe], |row| row.get(0))
        .map_err(|err| EngineError::StoreUnavailable(err.to_string()))?;

    match ts {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|err| EngineError::StoreUnavailable(err.to_string())),
        None => Ok(None),
    }
}
