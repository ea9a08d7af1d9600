//! Service Orchestrator (C9, §4.9): starts the fan-out server, opens one
//! upstream candle stream per `(timeframe, symbols)` in the engine's
//! [`SubscriptionPlan`], routes every candle into `Engine.process_candle`
//! (which itself owns persistence, broadcast, and forwarding — see
//! DESIGN.md), and drains everything on SIGINT/SIGTERM.
//!
//! Grounded on the teacher's `spawn_control_plane`
//! (`tesser-cli/src/control.rs`): a `tokio::spawn`'d
//! `Server::builder().add_service(...).serve_with_shutdown(addr, shutdown)`
//! plus a handful of sibling tasks gated on the same shutdown signal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use signal_engine::StrategyEngine;
use signal_rpc::client::MarketDataClient;
use signal_rpc::conversions::ohlc_from_proto;
use signal_rpc::proto::signal_fanout_service_server::SignalFanoutServiceServer;
use signal_rpc::proto::Subscription;
use signal_rpc::GrpcMarketDataClient;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tonic::transport::Server;
use tracing::{debug, error, info, warn};

use crate::fanout_service::FanoutGrpcService;
use crate::shutdown::ShutdownSignal;

/// Grace period C9 gives the fan-out server to drain in-flight streams once
/// shutdown is requested (§4.9: "waits <= 5s for the server to drain").
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct ServiceOrchestrator {
    engine: Arc<StrategyEngine>,
    hub: Arc<signal_engine::SubscriberHub>,
    dataservice_addr: String,
    fanout_addr: SocketAddr,
    shutdown: ShutdownSignal,
}

impl ServiceOrchestrator {
    pub fn new(
        engine: Arc<StrategyEngine>,
        hub: Arc<signal_engine::SubscriberHub>,
        dataservice_addr: String,
        fanout_addr: SocketAddr,
    ) -> Self {
        ServiceOrchestrator {
            engine,
            hub,
            dataservice_addr,
            fanout_addr,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Runs until a shutdown signal is observed, then drains. Fatal
    /// initialization errors (empty strategy catalog, unreadable history)
    /// propagate to the caller, which per §6 exits the process with code 1.
    pub async fn run(self) -> anyhow::Result<()> {
        self.engine
            .initialize()
            .await
            .context("strategy engine failed to initialize")?;
        let plan = self
            .engine
            .required_subscriptions()
            .context("computing upstream subscription plan")?;

        let fanout_service = FanoutGrpcService::new(self.hub.clone());
        let server_shutdown = self.shutdown.clone();
        let fanout_addr = self.fanout_addr;
        info!(addr = %fanout_addr, "starting signal fan-out gRPC server");
        let server_handle: JoinHandle<()> = tokio::spawn(async move {
            if let Err(err) = Server::builder()
                .add_service(SignalFanoutServiceServer::new(fanout_service))
                .serve_with_shutdown(fanout_addr, async move { server_shutdown.wait().await })
                .await
            {
                error!(error = %err, "fan-out server exited with error");
            }
        });

        let mut consumer_handles = Vec::new();
        for (timeframe, symbols) in plan {
            let symbols: Vec<String> = symbols.into_iter().collect();
            info!(%timeframe, symbol_count = symbols.len(), "subscribing to upstream candle feed");
            let engine = self.engine.clone();
            let addr = self.dataservice_addr.clone();
            let shutdown = self.shutdown.clone();
            consumer_handles.push(tokio::spawn(async move {
                run_timeframe_consumer(addr, timeframe, symbols, engine, shutdown).await;
            }));
        }

        wait_for_termination(&self.shutdown).await;
        info!("shutdown requested, draining");
        self.shutdown.trigger();

        for handle in consumer_handles {
            let _ = handle.await;
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await.is_err() {
            warn!("fan-out server did not drain within the grace period");
        }
        info!("signal-service shutdown complete");
        Ok(())
    }
}

/// Opens (and, on disconnect, does not retry — the orchestrator exits its
/// candle routing for that timeframe rather than masking an upstream outage)
/// a single `StreamOHLC` subscription and feeds every candle into the
/// engine until the stream ends or shutdown is requested.
async fn run_timeframe_consumer(
    dataservice_addr: String,
    timeframe: String,
    symbols: Vec<String>,
    engine: Arc<StrategyEngine>,
    shutdown: ShutdownSignal,
) {
    let mut client = GrpcMarketDataClient::new(dataservice_addr);
    let subscription = Subscription {
        symbols,
        timeframe: timeframe.clone(),
        include_trades: false,
        include_orderbook: false,
    };

    let mut stream = match client.stream_ohlc(subscription).await {
        Ok(stream) => stream,
        Err(err) => {
            error!(%timeframe, error = %err, "failed to open upstream candle stream");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                debug!(%timeframe, "candle consumer stopping for shutdown");
                break;
            }
            next = stream.next() => {
                match next {
                    Some(Ok(ohlc)) => {
                        let candle = ohlc_from_proto(&ohlc);
                        engine.process_candle(candle).await;
                    }
                    Some(Err(err)) => {
                        warn!(%timeframe, error = %err, "upstream candle stream error, stopping consumer");
                        break;
                    }
                    None => {
                        info!(%timeframe, "upstream candle stream ended");
                        break;
                    }
                }
            }
        }
    }
}

/// Waits for either SIGINT (Ctrl-C) or, on unix, SIGTERM.
async fn wait_for_termination(shutdown: &ShutdownSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
            _ = shutdown.wait() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = shutdown.wait() => {}
        }
    }
}
