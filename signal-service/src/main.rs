use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use governor::Quota;
use nonzero_ext::nonzero;
use signal_config::Config;
use signal_engine::{ExecutionForwarder, RateLimiter, StrategyEngine, SubscriberHub};
use signal_rpc::RetryingExecutionClient;
use signal_service::ServiceOrchestrator;
use signal_store::{Catalog, HistoryStore, SignalStore, StrategyCatalog};
use tracing_subscriber::EnvFilter;

/// Downstream execution RPCs time out after 5s and back off 1s per retry
/// attempt, matching the fixed values in §4.6 (not exposed through
/// [`Config`] since the spec treats them as engine constants, not deployment
/// knobs).
const EXECUTION_TIMEOUT_MS: u64 = 5_000;
const EXECUTION_RETRY_DELAY_MS: u64 = 1_000;

// Outbound order rate cap. Not named by the spec; sized generously so the
// limiter only ever engages under a genuine signal storm, the way
// `tesser-broker`'s forwarding path treats its own rate limit as a safety
// net rather than a throttle on ordinary operation.

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "signal-service exited with a fatal error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    tracing::info!(trading_mode = ?config.trading_mode, "signal-service starting");

    let db_path = config
        .database_url
        .strip_prefix("sqlite://")
        .unwrap_or(&config.database_url);
    let catalog = Catalog::open(db_path).context("opening catalog database")?;

    let hub = SubscriberHub::new(signal_engine::MIN_QUEUE_BOUND);

    let execution_client = RetryingExecutionClient::new(
        config.executionservice_addr.clone(),
        EXECUTION_TIMEOUT_MS,
        EXECUTION_RETRY_DELAY_MS,
    );
    let limiter = RateLimiter::new(Quota::per_second(nonzero!(50u32)));
    let forwarder = Arc::new(ExecutionForwarder::new(Box::new(execution_client), limiter));

    let engine = Arc::new(StrategyEngine::new(
        StrategyCatalog::new(catalog.clone()),
        HistoryStore::new(catalog.clone()),
        SignalStore::new(catalog.clone()),
        hub.clone(),
        forwarder,
        Some(config.trading_mode),
        config.signal_cooldown_minutes,
    ));

    let fanout_addr: SocketAddr = ([0, 0, 0, 0], config.signalservice_port).into();
    let orchestrator = ServiceOrchestrator::new(engine, hub, config.dataservice_addr.clone(), fanout_addr);
    orchestrator.run().await
}
