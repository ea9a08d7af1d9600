use thiserror::Error;

use signal_core::EngineError;

/// Transport-level errors raised by the retrying client adapter, kept
/// separate from [`EngineError`] so callers can inspect the gRPC status
/// before deciding how to fold it into the engine's error table (§7).
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("rpc call failed: {0}")]
    Status(#[from] tonic::Status),

    #[error("invalid wire payload: {0}")]
    InvalidPayload(String),
}

impl RpcError {
    /// True for statuses the execution forwarder's bounded retry loop
    /// should retry (4.6): connection-level failures and the subset of
    /// gRPC codes that mean "try again", never `InvalidArgument` or
    /// `FailedPrecondition` which mean the request itself is wrong.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(_) => true,
            RpcError::Status(status) => matches!(
                status.code(),
                tonic::Code::Unavailable | tonic::Code::DeadlineExceeded | tonic::Code::ResourceExhausted
            ),
            RpcError::InvalidPayload(_) => false,
        }
    }
}

/// Folds a terminal (non-retryable, or retries-exhausted) RPC failure into
/// the engine's error table: `InvalidArgument`/`FailedPrecondition` and
/// payload problems are permanent, everything else that ran out of
/// retries is transient.
pub fn classify(context: &str, error: &RpcError) -> EngineError {
    let permanent = match error {
        RpcError::Status(status) => matches!(
            status.code(),
            tonic::Code::InvalidArgument | tonic::Code::FailedPrecondition | tonic::Code::PermissionDenied
        ),
        RpcError::InvalidPayload(_) => true,
        RpcError::Transport(_) => false,
    };

    if permanent {
        EngineError::PermanentExec(format!("{context}: {error}"))
    } else {
        EngineError::TransientExec(format!("{context}: {error}"))
    }
}
