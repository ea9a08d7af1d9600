//! Execution Forwarder (C6, §4.6): translates an emitted `Signal` into an
//! `OrderRequest` and forwards it to the downstream execution endpoint. The
//! bounded-retry-with-linear-backoff loop lives in
//! `signal_rpc::transport::grpc::RetryingExecutionClient`; this module's job
//! is the Signal -> OrderRequest translation, outbound rate limiting, and
//! folding the client's terminal result into the engine's error table (§7).

use rust_decimal::Decimal;
use signal_core::{EngineError, Signal, TradingMode};
use signal_rpc::client::ExecutionClient;
use signal_rpc::conversions::signal_to_order_request;
use signal_rpc::error::classify;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::limiter::RateLimiter;

/// Nominal order size used for every forwarded signal. Position sizing is
/// explicitly out of scope here (§1: "Individual strategy formulas... are
/// domain trivia"; the `Signal` data model in §3 carries no size field) —
/// a real deployment would consult a portfolio/risk sizing service upstream
/// of the forwarder.
const NOMINAL_ORDER_SIZE: Decimal = Decimal::ONE;

pub struct ExecutionForwarder {
    client: Mutex<Box<dyn ExecutionClient>>,
    limiter: RateLimiter,
}

impl ExecutionForwarder {
    pub fn new(client: Box<dyn ExecutionClient>, limiter: RateLimiter) -> Self {
        ExecutionForwarder {
            client: Mutex::new(client),
            limiter,
        }
    }

    /// Forwards `signal` downstream (4.6). The retry loop inside the
    /// underlying client already exhausted `max_retries` by the time an
    /// error reaches here, so this never retries itself — it logs and
    /// returns, matching "the engine catches and logs (the signal is
    /// already persisted, so no retry queue is needed)".
    pub async fn execute(&self, signal: &Signal, mode: TradingMode) -> Result<(), EngineError> {
        self.limiter.until_ready().await;
        let request = signal_to_order_request(signal, mode, NOMINAL_ORDER_SIZE);

        let mut client = self.client.lock().await;
        match client.execute_signal(request).await {
            Ok(status) => {
                info!(
                    signal_id = %signal.idempotency_key,
                    accepted = status.accepted,
                    "execution acknowledged"
                );
                Ok(())
            }
            Err(err) => {
                let classified = classify("execute_signal", &err);
                warn!(
                    signal_id = %signal.idempotency_key,
                    error = %classified,
                    "execution forwarding failed"
                );
                Err(classified)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use governor::Quota;
    use nonzero_ext::nonzero;
    use rust_decimal::Decimal;
    use signal_core::SignalSide;
    use signal_rpc::error::RpcError;
    use signal_rpc::proto::{OrderRequest, OrderStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::str::FromStr;

    struct CountingClient {
        calls: Arc<AtomicUsize>,
        outcome: Result<(), ()>,
    }

    #[async_trait]
    impl ExecutionClient for CountingClient {
        async fn execute_signal(&mut self, request: OrderRequest) -> Result<OrderStatus, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Ok(()) => Ok(OrderStatus {
                    signal_id: request.signal_id,
                    accepted: true,
                    message: String::new(),
                }),
                Err(()) => Err(RpcError::Status(tonic::Status::invalid_argument("bad request"))),
            }
        }
    }

    fn sample_signal() -> Signal {
        let mut signal = Signal::entry(SignalSide::Long, Decimal::from_str("100").unwrap(), 0.8);
        signal.strategy_id = "sma-cross".to_string();
        signal.symbol = "BTCUSDT".to_string();
        signal
    }

    #[tokio::test]
    async fn forwards_successfully() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CountingClient {
            calls: calls.clone(),
            outcome: Ok(()),
        };
        let forwarder = ExecutionForwarder::new(
            Box::new(client),
            RateLimiter::new(Quota::per_second(nonzero!(1000u32))),
        );
        forwarder.execute(&sample_signal(), TradingMode::Paper).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permanent_failure_is_classified_and_returned() {
        let client = CountingClient {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome: Err(()),
        };
        let forwarder = ExecutionForwarder::new(
            Box::new(client),
            RateLimiter::new(Quota::per_second(nonzero!(1000u32))),
        );
        let err = forwarder
            .execute(&sample_signal(), TradingMode::Paper)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermanentExec(_)));
    }
}
