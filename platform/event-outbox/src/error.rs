use thiserror::Error;

/// Infrastructure-level outbox failures
///
/// These abort a drain cycle (fetch or flush) or an enqueue. Failures of a
/// single record's delivery are not errors at this level: they are recorded
/// on the record itself, see [`DeliveryFailure`](crate::DeliveryFailure).
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("outbox record {0} does not exist")]
    UnknownRecord(i64),

    #[error("outbox store unavailable: {0}")]
    Unavailable(String),
}
