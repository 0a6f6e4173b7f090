use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The target integration or route cannot currently accept calls.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    /// Transport-level failure talking to an external system.
    #[error("Downstream error: {0}")]
    Downstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
