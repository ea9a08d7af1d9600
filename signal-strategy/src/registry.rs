//! The process-wide Strategy Registry (C1): maps a strategy `name` to the
//! factory that can build an instance of it from a catalog row. Append-only
//! after startup and safe to read from any task.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use signal_core::{EngineError, StrategyConfig};

use crate::instance::{Strategy, StrategyInstance};
use crate::logic::StrategyLogic;

/// Builds a boxed [`Strategy`] from a catalog row. Implemented generically
/// by [`GenericStrategyFactory`] for every registered [`StrategyLogic`].
pub trait StrategyFactory: Send + Sync {
    fn canonical_name(&self) -> &str;
    fn aliases(&self) -> &[String];
    fn build(&self, config: &StrategyConfig) -> Result<Box<dyn Strategy>, EngineError>;
}

/// A `StrategyFactory` for any type implementing [`StrategyLogic`], used by
/// the `register_strategy!` macro so concrete strategies never hand-write a
/// factory of their own.
pub struct GenericStrategyFactory<T> {
    canonical_name: String,
    aliases: Vec<String>,
    marker: PhantomData<fn() -> T>,
}

impl<T> GenericStrategyFactory<T>
where
    T: StrategyLogic,
{
    pub fn new(canonical_name: &str, aliases: &[&str]) -> Self {
        GenericStrategyFactory {
            canonical_name: canonical_name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            marker: PhantomData,
        }
    }
}

impl<T> StrategyFactory for GenericStrategyFactory<T>
where
    T: StrategyLogic,
{
    fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn build(&self, config: &StrategyConfig) -> Result<Box<dyn Strategy>, EngineError> {
        let logic = T::build(config)?;
        Ok(Box::new(StrategyInstance::new(config, logic)))
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[derive(Default)]
struct RegistryInner {
    by_canonical: HashMap<String, Arc<dyn StrategyFactory>>,
    by_alias: HashMap<String, String>,
}

/// Process-wide registry of strategy factories, populated at startup by the
/// `#[ctor]` shims that `register_strategy!` expands to.
pub struct StrategyRegistry {
    inner: RwLock<RegistryInner>,
}

impl StrategyRegistry {
    fn new() -> Self {
        StrategyRegistry {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    pub fn register(&self, factory: Arc<dyn StrategyFactory>) {
        let canonical = normalize_name(factory.canonical_name());
        let mut inner = self.inner.write();
        for alias in factory.aliases() {
            inner.by_alias.insert(normalize_name(alias), canonical.clone());
        }
        inner.by_canonical.insert(canonical, factory);
    }

    pub fn create_strategy(
        &self,
        name: &str,
        config: &StrategyConfig,
    ) -> Result<Box<dyn Strategy>, EngineError> {
        let inner = self.inner.read();
        let key = normalize_name(name);
        let canonical = inner.by_alias.get(&key).cloned().unwrap_or(key);
        let factory = inner
            .by_canonical
            .get(&canonical)
            .ok_or_else(|| EngineError::UnknownStrategy(name.to_string()))?;
        factory.build(config)
    }

    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut names: Vec<String> = inner.by_canonical.keys().cloned().collect();
        names.sort();
        names
    }
}

static STRATEGY_REGISTRY: Lazy<StrategyRegistry> = Lazy::new(StrategyRegistry::new);

/// Registers a strategy factory with the global registry. Called by the
/// `#[ctor]` functions the `register_strategy!` macro expands to.
pub fn register_strategy_factory(factory: Arc<dyn StrategyFactory>) {
    STRATEGY_REGISTRY.register(factory);
}

/// Builds a strategy instance from a catalog row (C1's `create_strategy`).
pub fn create_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>, EngineError> {
    STRATEGY_REGISTRY.create_strategy(&config.name, config)
}

/// The set of canonical strategy names currently registered.
pub fn registered_names() -> Vec<String> {
    STRATEGY_REGISTRY.names()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{EntryDecision, ExitDecision};
    use signal_core::{Candle, HistoryBar, Position, PositionSide, StrategyStatus, TradingMode};
    use uuid::Uuid;

    struct AlwaysFlat;

    impl StrategyLogic for AlwaysFlat {
        fn build(_config: &StrategyConfig) -> Result<Self, EngineError> {
            Ok(AlwaysFlat)
        }

        fn min_bars(&self) -> usize {
            1
        }

        fn evaluate_entry(&mut self, _candle: &Candle, _history: &[HistoryBar]) -> Option<EntryDecision> {
            None
        }

        fn evaluate_exit(
            &mut self,
            _candle: &Candle,
            _history: &[HistoryBar],
            _position: &Position,
        ) -> Option<ExitDecision> {
            None
        }
    }

    fn sample_config(name: &str) -> StrategyConfig {
        StrategyConfig {
            id: Uuid::new_v4(),
            name: name.to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({}),
            symbols: vec!["BTCUSDT".to_string()],
            timeframes: vec!["5m".to_string()],
            mode: TradingMode::Paper,
            init_periods: 1,
            status: StrategyStatus::Active,
            is_live: false,
        }
    }

    #[test]
    fn unregistered_name_fails_with_unknown_strategy() {
        let config = sample_config("definitely-not-registered");
        let err = create_strategy(&config).unwrap_err();
        assert!(matches!(err, EngineError::UnknownStrategy(_)));
    }

    #[test]
    fn registered_factory_builds_and_is_alias_reachable() {
        register_strategy_factory(Arc::new(GenericStrategyFactory::<AlwaysFlat>::new(
            "AlwaysFlatTest",
            &["AFT"],
        )));

        let config = sample_config("AlwaysFlatTest");
        let instance = create_strategy(&config).unwrap();
        assert_eq!(instance.name(), "AlwaysFlatTest");

        let via_alias = sample_config("aft");
        assert!(create_strategy(&via_alias).is_ok());
        assert!(registered_names().contains(&"alwaysflattest".to_string()));
        let _ = PositionSide::Long;
    }
}
