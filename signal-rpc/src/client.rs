use async_trait::async_trait;

use crate::error::RpcError;
use crate::proto;

/// Transport-agnostic interface to the downstream execution service (4.6).
/// Production code talks to a [`crate::transport::grpc::RetryingExecutionClient`];
/// tests substitute an in-memory fake.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn execute_signal(&mut self, request: proto::OrderRequest) -> Result<proto::OrderStatus, RpcError>;
}

/// Transport-agnostic interface to the signal fan-out service's unary
/// publish hook, used by C7 to push a signal to the streaming broadcast
/// side out-of-process (when the fan-out hub runs as its own service
/// rather than in-process with the engine).
#[async_trait]
pub trait SignalPublisher: Send + Sync {
    async fn publish_signal(&mut self, signal: proto::TradeSignal) -> Result<proto::SignalAck, RpcError>;
}

/// Transport-agnostic interface to the upstream market data service's
/// candle feed (4.1), returning the bar stream for one subscription.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    type Stream: tokio_stream::Stream<Item = Result<proto::OHLC, RpcError>> + Send + Unpin;

    async fn stream_ohlc(&mut self, subscription: proto::Subscription) -> Result<Self::Stream, RpcError>;
}
