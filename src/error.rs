use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while processing one user in the alert
/// pipeline. The runner catches these per user; the read path maps them to
/// HTTP statuses. A zero salary is deliberately not represented here: the
/// evaluator treats it as "insufficient data" and simply never fires.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("expense query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("aggregation read timed out after {0:?}")]
    QueryTimeout(Duration),

    #[error("alert delivery failed: {0}")]
    Delivery(String),

    #[error("alert delivery timed out after {0:?}")]
    DeliveryTimeout(Duration),
}
