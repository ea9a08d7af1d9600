use thiserror::Error;

/// Errors surfaced across the engine's component boundaries (§7). Each
/// variant maps to exactly one row of the error handling table; the policy
/// for each (propagate/log-and-skip/fatal) lives with the caller, not here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("history/signal store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unknown instrument for symbol: {0}")]
    UnknownInstrument(String),

    #[error("subscriber queue full, signal dropped for subscriber {0}")]
    SubscriberSlow(String),

    #[error("transient execution error: {0}")]
    TransientExec(String),

    #[error("permanent execution error: {0}")]
    PermanentExec(String),

    #[error("catalog initialization failed: {0}")]
    CatalogInit(String),

    #[error("no active strategies were loaded from the catalog")]
    NoActiveStrategies,

    #[error("strategy evaluation panicked or errored for {strategy_id}/{symbol}: {source}")]
    StrategyEvaluation {
        strategy_id: String,
        symbol: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    /// True for the two error classes in §7 where the fatal exit-code-1 path
    /// applies during `initialize()`.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            EngineError::CatalogInit(_) | EngineError::NoActiveStrategies
        )
    }
}
