use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use shared::*;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::error::ApiError;
use crate::queue::IntakeQueue;
use crate::store::TicketStore;

pub struct AppState<S> {
    pub queue: IntakeQueue,
    pub store: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub queue_depth: usize,
    pub queue_capacity: usize,
}

pub fn create_router<S: TicketStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/buy", post(buy::<S>))
        .route("/resources/:id", get(resource_status::<S>))
        .route("/health", get(health_check::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

/// Admission only: answers as soon as the request is queued or shed.
pub async fn buy<S: TicketStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<BuyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BuyResponse>), ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Validation(format!("invalid request body: {}", e.body_text())))?;

    let requester_id = request.requester_id.trim();
    if requester_id.is_empty() {
        return Err(ApiError::Validation("requester_id must not be empty".to_string()));
    }

    match state.queue.submit(request.resource_id, requester_id) {
        AdmissionResult::Accepted => Ok((StatusCode::ACCEPTED, Json(BuyResponse::pending()))),
        AdmissionResult::Rejected => Err(ApiError::Overloaded),
    }
}

pub async fn resource_status<S: TicketStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResourceStatus>, ApiError> {
    state
        .store
        .resource_status(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

pub async fn health_check<S: TicketStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        queue_depth: state.queue.pending(),
        queue_capacity: state.queue.capacity(),
    })
}
