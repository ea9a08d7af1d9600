//! Wire types and a retrying client adapter for the external interfaces in
//! §6: candle ingestion from the market data service, signal fan-out, and
//! execution forwarding.

pub mod client;
pub mod conversions;
pub mod error;
pub mod proto;
pub mod transport;

pub use client::{ExecutionClient, MarketDataClient, SignalPublisher};
pub use error::{classify, RpcError};
pub use transport::grpc::{GrpcMarketDataClient, OhlcStream, RetryingExecutionClient};
