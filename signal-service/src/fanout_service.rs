//! The `SignalFanoutService` gRPC server (C7's wire surface, §6):
//! `StreamSignals` hands the caller a live [`SignalSubscription`] rewrapped
//! as a `TradeSignal` stream, `PublishSignal` is the unary test-injection
//! hook that pushes straight onto the hub's broadcast path, bypassing C5
//! entirely. Grounded on the teacher's `ControlGrpcService`
//! (`tesser-cli/src/control.rs`): a thin struct wrapping `Arc`-shared state,
//! one method per RPC.

use std::pin::Pin;
use std::sync::Arc;

use signal_core::Signal;
use signal_engine::{SignalFilter, SubscriberHub};
use signal_rpc::proto::signal_fanout_service_server::SignalFanoutService;
use signal_rpc::proto::{SignalAck, SignalSubscription, TradeSignal};
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status};
use tracing::info;

pub struct FanoutGrpcService {
    hub: Arc<SubscriberHub>,
}

impl FanoutGrpcService {
    pub fn new(hub: Arc<SubscriberHub>) -> Self {
        FanoutGrpcService { hub }
    }
}

#[tonic::async_trait]
impl SignalFanoutService for FanoutGrpcService {
    type StreamSignalsStream = Pin<Box<dyn Stream<Item = Result<TradeSignal, Status>> + Send + 'static>>;

    async fn stream_signals(
        &self,
        request: Request<SignalSubscription>,
    ) -> Result<Response<Self::StreamSignalsStream>, Status> {
        let payload = request.into_inner();
        let filter = SignalFilter {
            strategy_ids: payload.strategy_ids,
            symbols: payload.symbols,
        };
        let subscription = self.hub.subscribe(filter);
        info!(
            subscriber_count = self.hub.subscriber_count(),
            "new fan-out subscriber"
        );
        let stream = subscription.map(|signal| Ok(TradeSignal::from(&signal)));
        Ok(Response::new(Box::pin(stream)))
    }

    async fn publish_signal(&self, request: Request<TradeSignal>) -> Result<Response<SignalAck>, Status> {
        let wire = request.into_inner();
        let signal: Signal = Signal::from(&wire);
        let idempotency_key = signal.idempotency_key.to_string();
        self.hub.broadcast(&signal);
        Ok(Response::new(SignalAck {
            accepted: true,
            idempotency_key,
        }))
    }
}
