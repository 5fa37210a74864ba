//! HTTP Handlers
//!
//! Bodies are read as raw bytes and decoded here so that malformed JSON
//! maps to 400 rather than axum's 422.

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{
    HealthResponse, PublishRequest, PublishResponse, RegisterRequest, UserResponse,
};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use courier_core::application::QueueInfo;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid request: {}", e)))
}

/// POST /api/v1/publish
pub async fn publish(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    let req: PublishRequest = decode(&body)?;

    if req.queue_name.is_empty() || req.event.is_empty() {
        return Err(ApiError::BadRequest(
            "queueName and event are required".to_string(),
        ));
    }

    state
        .queues
        .define_queue(
            &req.queue_name,
            state.defaults.producers,
            state.defaults.consumers,
            state.handler.clone(),
        )
        .await
        .map_err(ApiError::app("failed to define queue"))?;

    state
        .queues
        .send_message(&req.queue_name, req.event)
        .await
        .map_err(ApiError::app("failed to send message"))?;

    debug!(queue = %req.queue_name, "Message accepted");
    Ok(Json(PublishResponse {
        status: "sent".to_string(),
        queue_name: req.queue_name,
    }))
}

/// POST /api/v1/register
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let req: RegisterRequest = decode(&body)?;

    if req.name.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "name, email and password are required".to_string(),
        ));
    }

    let user = state
        .users
        .add_user(&req.name, &req.email, &req.password)
        .await
        .map_err(ApiError::app("failed to register user"))?;

    info!(user_id = %user.id, "Registered user via HTTP");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get_user(&id)
        .await
        .map_err(ApiError::app("failed to load user"))?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", id)))?;

    Ok(Json(UserResponse::from(user)))
}

/// GET /api/v1/queues
pub async fn list_queues(State(state): State<AppState>) -> Json<Vec<QueueInfo>> {
    Json(state.queues.queues())
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: courier_core::VERSION.to_string(),
    })
}
