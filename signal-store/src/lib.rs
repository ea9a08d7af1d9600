//! The catalog-backed History Store (C2) and Signal Store (C3), plus the
//! strategy-catalog loader `initialize()` needs. Every query runs inside
//! `tokio::task::spawn_blocking` since `rusqlite` is synchronous.

mod catalog;
mod history;
mod signal_store;
mod strategy_catalog;

pub use catalog::Catalog;
pub use history::{BarSource, HistoryStore};
pub use signal_store::SignalStore;
pub use strategy_catalog::StrategyCatalog;
