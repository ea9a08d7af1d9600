use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio_stream::Stream;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;
use tracing::{debug, warn};

use crate::client::{ExecutionClient, MarketDataClient};
use crate::error::RpcError;
use crate::proto::execution_service_client::ExecutionServiceClient;
use crate::proto::market_data_service_client::MarketDataServiceClient;
use crate::proto::{OrderRequest, OrderStatus, Subscription, OHLC};

/// A gRPC-backed [`ExecutionClient`] with a bounded, linearly-backed-off
/// retry loop (4.6): up to `max_retries` attempts, sleeping
/// `retry_delay * attempt` between them, reconnecting whenever a call
/// fails. `InvalidArgument`/`FailedPrecondition` never retry — those mean
/// the request itself is malformed, not that the service is unavailable.
pub struct RetryingExecutionClient {
    endpoint: String,
    client: Option<ExecutionServiceClient<Channel>>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl RetryingExecutionClient {
    pub fn new(endpoint: String, timeout_ms: u64, retry_delay_ms: u64) -> Self {
        Self {
            endpoint,
            client: None,
            timeout: Duration::from_millis(timeout_ms.max(1)),
            max_retries: 3,
            retry_delay: Duration::from_millis(retry_delay_ms.max(1)),
        }
    }

    async fn connect(&mut self) -> Result<(), RpcError> {
        debug!("connecting to execution service at {}", self.endpoint);
        let channel = Endpoint::from_shared(self.endpoint.clone())?
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .connect()
            .await?;
        self.client = Some(ExecutionServiceClient::new(channel));
        Ok(())
    }

    async fn call_with_retry<T, F, Fut>(&mut self, mut op: F) -> Result<T, RpcError>
    where
        F: FnMut(ExecutionServiceClient<Channel>) -> Fut,
        Fut: Future<Output = (ExecutionServiceClient<Channel>, Result<T, Status>)>,
    {
        let mut attempt = 0u32;
        loop {
            if self.client.is_none() {
                self.connect().await?;
            }
            attempt += 1;
            let client = self
                .client
                .take()
                .expect("client populated by the connect() call above");
            let (client, result) = op(client).await;
            match result {
                Ok(value) => {
                    self.client = Some(client);
                    return Ok(value);
                }
                Err(status) => {
                    let error = RpcError::Status(status);
                    if error.is_retryable() && attempt < self.max_retries {
                        warn!(
                            attempt,
                            max_retries = self.max_retries,
                            "execution call failed; retrying"
                        );
                        self.client = None;
                        tokio::time::sleep(self.retry_delay * attempt).await;
                        continue;
                    }
                    self.client = Some(client);
                    return Err(error);
                }
            }
        }
    }
}

#[async_trait]
impl ExecutionClient for RetryingExecutionClient {
    async fn execute_signal(&mut self, request: OrderRequest) -> Result<OrderStatus, RpcError> {
        let timeout = self.timeout;
        self.call_with_retry(move |mut client| {
            let mut wire_request = tonic::Request::new(request.clone());
            wire_request.set_timeout(timeout);
            async move {
                let response = client
                    .execute_signal(wire_request)
                    .await
                    .map(|resp| resp.into_inner());
                (client, response)
            }
        })
        .await
    }
}

/// A gRPC-backed [`MarketDataClient`] (4.1/4.9): opens one server-streaming
/// `StreamOHLC` call per subscription. Reconnects lazily on the next call
/// after a connection is lost — the orchestrator's per-timeframe task owns
/// retrying the stream itself, so this adapter does not retry internally.
pub struct GrpcMarketDataClient {
    endpoint: String,
    client: Option<MarketDataServiceClient<Channel>>,
}

impl GrpcMarketDataClient {
    pub fn new(endpoint: String) -> Self {
        GrpcMarketDataClient { endpoint, client: None }
    }

    async fn connected_client(&mut self) -> Result<MarketDataServiceClient<Channel>, RpcError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        debug!("connecting to market data service at {}", self.endpoint);
        let channel = Endpoint::from_shared(self.endpoint.clone())?.connect().await?;
        let client = MarketDataServiceClient::new(channel);
        self.client = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl MarketDataClient for GrpcMarketDataClient {
    type Stream = OhlcStream;

    async fn stream_ohlc(&mut self, subscription: Subscription) -> Result<Self::Stream, RpcError> {
        let mut client = self.connected_client().await?;
        match client.stream_ohlc(subscription).await {
            Ok(response) => Ok(OhlcStream {
                inner: response.into_inner(),
            }),
            Err(status) => {
                self.client = None;
                Err(RpcError::Status(status))
            }
        }
    }
}

/// Adapts a [`tonic::Streaming`] response into the `Stream<Item = Result<OHLC, RpcError>>`
/// shape [`MarketDataClient`] requires.
pub struct OhlcStream {
    inner: tonic::Streaming<OHLC>,
}

impl Stream for OhlcStream {
    type Item = Result<OHLC, RpcError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(ohlc))) => Poll::Ready(Some(Ok(ohlc))),
            Poll::Ready(Some(Err(status))) => Poll::Ready(Some(Err(RpcError::Status(status)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
