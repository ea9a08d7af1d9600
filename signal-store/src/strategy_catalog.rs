//! Loads `StrategyConfig` rows from the catalog for `initialize()` (4.5.1).
//! `symbols`/`timeframes` are stored as JSON-encoded TEXT columns — the
//! teacher's catalog tables are sqlite, which has no native array type.

use std::str::FromStr;

use rusqlite::{params, Connection};
use signal_core::{EngineError, StrategyConfig, StrategyStatus, TradingMode};
use uuid::Uuid;

use crate::catalog::Catalog;

#[derive(Clone)]
pub struct StrategyCatalog {
    catalog: Catalog,
}

impl StrategyCatalog {
    pub fn new(catalog: Catalog) -> Self {
        StrategyCatalog { catalog }
    }

    /// Loads `status = 'active'` rows, optionally filtered by `mode`
    /// (4.5.1). On sqlite failure this is a fatal `CatalogInit` — the
    /// engine cannot start without its strategy set.
    pub async fn load_active(&self, mode: Option<TradingMode>) -> Result<Vec<StrategyConfig>, EngineError> {
        let catalog = self.catalog.clone();
        tokio::task::spawn_blocking(move || load_active_blocking(&catalog, mode))
            .await
            .map_err(|err| EngineError::CatalogInit(err.to_string()))?
    }

    /// Inserts or replaces a strategy row — used by tests and by any
    /// catalog-seeding tooling outside the engine's hot path.
    pub async fn upsert(&self, config: StrategyConfig) -> Result<(), EngineError> {
        let catalog = self.catalog.clone();
        tokio::task::spawn_blocking(move || upsert_blocking(&catalog, &config))
            .await
            .map_err(|err| EngineError::CatalogInit(err.to_string()))?
    }
}

fn load_active_blocking(
    catalog: &Catalog,
    mode: Option<TradingMode>,
) -> Result<Vec<StrategyConfig>, EngineError> {
    let conn = catalog.connect().map_err(|err| EngineError::CatalogInit(err.to_string()))?;
    let sql = "SELECT id, name, version, params, symbols, timeframes, mode, is_live, status, init_periods
               FROM strategies
               WHERE status = 'active' AND (?1 IS NULL OR mode = ?1)";
    let mode_filter = mode.map(|m| m.as_str().to_string());

    let mut stmt = conn
        .prepare(sql)
        .map_err(|err| EngineError::CatalogInit(err.to_string()))?;
    let mut rows = stmt
        .query(params![mode_filter])
        .map_err(|err| EngineError::CatalogInit(err.to_string()))?;

    let mut configs = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| EngineError::CatalogInit(err.to_string()))?
    {
        configs.push(row_to_config(row)?);
    }
    Ok(configs)
}

fn row_to_config(row: &rusqlite::Row<'_>) -> Result<StrategyConfig, EngineError> {
    let err = |e: String| EngineError::CatalogInit(format!("corrupt strategy row: {e}"));

    let id: String = row.get(0).map_err(|e| err(e.to_string()))?;
    let name: String = row.get(1).map_err(|e| err(e.to_string()))?;
    let version: String = row.get(2).map_err(|e| err(e.to_string()))?;
    let params_json: String = row.get(3).map_err(|e| err(e.to_string()))?;
    let symbols_json: String = row.get(4).map_err(|e| err(e.to_string()))?;
    let timeframes_json: String = row.get(5).map_err(|e| err(e.to_string()))?;
    let mode_str: String = row.get(6).map_err(|e| err(e.to_string()))?;
    let is_live: i64 = row.get(7).map_err(|e| err(e.to_string()))?;
    let status_str: String = row.get(8).map_err(|e| err(e.to_string()))?;
    let init_periods: i64 = row.get(9).map_err(|e| err(e.to_string()))?;

    Ok(StrategyConfig {
        id: Uuid::parse_str(&id).map_err(|e| err(e.to_string()))?,
        name,
        version,
        params: serde_json::from_str(&params_json).map_err(|e| err(e.to_string()))?,
        symbols: serde_json::from_str(&symbols_json).map_err(|e| err(e.to_string()))?,
        timeframes: serde_json::from_str(&timeframes_json).map_err(|e| err(e.to_string()))?,
        mode: TradingMode::from_str(&mode_str)?,
        init_periods: init_periods as u32,
        status: match status_str.as_str() {
            "active" => StrategyStatus::Active,
            _ => StrategyStatus::Inactive,
        },
        is_live: is_live != 0,
    })
}

fn upsert_blocking(catalog: &Catalog, config: &StrategyConfig) -> Result<(), EngineError> {
    let conn: Connection = catalog.connect().map_err(|err| EngineError::CatalogInit(err.to_string()))?;
    conn.execute(
        "INSERT INTO strategies (id, name, version, params, symbols, timeframes, mode, is_live, status, init_periods)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name, version = excluded.version, params = excluded.params,
            symbols = excluded.symbols, timeframes = excluded.timeframes, mode = excluded.mode,
            is_live = excluded.is_live, status = excluded.status, init_periods = excluded.init_periods",
        params![
            config.id.to_string(),
            config.name,
            config.version,
            serde_json::to_string(&config.params).map_err(|e| EngineError::CatalogInit(e.to_string()))?,
            serde_json::to_string(&config.symbols).map_err(|e| EngineError::CatalogInit(e.to_string()))?,
            serde_json::to_string(&config.timeframes).map_err(|e| EngineError::CatalogInit(e.to_string()))?,
            config.mode.as_str(),
            config.is_live as i64,
            if config.is_active() { "active" } else { "inactive" },
            config.init_periods,
        ],
    )
    .map_err(|err| EngineError::CatalogInit(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, mode: TradingMode) -> StrategyConfig {
        StrategyConfig {
            id: Uuid::new_v4(),
            name: name.to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({"fast_period": 10}),
            symbols: vec!["BTCUSDT".to_string()],
            timeframes: vec!["5m".to_string()],
            mode,
            init_periods: 50,
            status: StrategyStatus::Active,
            is_live: false,
        }
    }

    #[tokio::test]
    async fn load_active_filters_by_mode() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("catalog.db")).unwrap();
        let store = StrategyCatalog::new(catalog);

        store.upsert(sample("SmaCross", TradingMode::Paper)).await.unwrap();
        store.upsert(sample("RsiReversion", TradingMode::Live)).await.unwrap();

        let paper_only = store.load_active(Some(TradingMode::Paper)).await.unwrap();
        assert_eq!(paper_only.len(), 1);
        assert_eq!(paper_only[0].name, "SmaCross");

        let all = store.load_active(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
