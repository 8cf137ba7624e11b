use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel_async::pooled_connection::PoolError;
use shared::{ErrorResponse, FulfillmentOutcome};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<PoolError>),

    #[error("resource {resource_id} was modified concurrently (expected version {expected})")]
    VersionConflict { resource_id: Uuid, expected: i32 },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Terminal outcomes of one fulfillment attempt. None of them are retried.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("resource {0} not found")]
    ResourceNotFound(Uuid),

    #[error("resource {0} is sold out")]
    SoldOut(Uuid),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl FulfillmentError {
    pub fn outcome(&self) -> FulfillmentOutcome {
        match self {
            FulfillmentError::ResourceNotFound(_) => FulfillmentOutcome::NotFound,
            FulfillmentError::SoldOut(_) => FulfillmentOutcome::SoldOut,
            FulfillmentError::Persistence(_) => FulfillmentOutcome::CommitFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("intake queue is full")]
    QueueFull,

    #[error("intake queue is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("system is busy, try again later")]
    Overloaded,

    #[error("resource {0} not found")]
    NotFound(Uuid),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Store(e) => {
                error!("Store error while serving request: {}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status_code(), Json(ErrorResponse::new(message))).into_response()
    }
}
