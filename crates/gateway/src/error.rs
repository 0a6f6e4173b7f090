use afya_core::error::CoreError;
use afya_core::rate_limit::LimiterError;

/// Errors raised while executing an integration call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Domain outcome: not found, unavailable, rate limited, downstream failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Limiter(#[from] LimiterError),

    /// The task running an admitted call panicked or was aborted.
    #[error("Execution task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
