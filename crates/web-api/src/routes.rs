use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use validator::{Validate, ValidationError};

use application::{CreateChatRequest, SendMessageRequest};
use domain::ChatId;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize, Validate)]
struct CreateChatPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "chat name must not be empty"))]
    chat_name: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "at least one user is required"),
        custom(function = "validate_user_ids")
    )]
    users_id: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct ChatPath {
    #[validate(range(min = 1, message = "chat id must be positive"))]
    id: i64,
}

#[derive(Debug, Deserialize, Validate)]
struct SendMessagePayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "sender must not be empty"))]
    from: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "text must not be empty"))]
    text: String,
    #[serde(default)]
    #[validate(required(message = "timestamp is required"))]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct IdResponse {
    id: i64,
}

fn validate_user_ids(user_ids: &[String]) -> Result<(), ValidationError> {
    if user_ids.iter().any(|id| id.is_empty()) {
        return Err(ValidationError::new("empty_user_id")
            .with_message("user ids must not be empty".into()));
    }
    Ok(())
}

/// 构建路由。超过 `request_timeout` 的请求被取消，进行中的事务不会提交。
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::map_response(timeout_body))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chats", post(create_chat))
        .route("/chats/{id}", delete(delete_chat))
        .route("/messages", post(send_message))
}

/// 超时层只返回空的 408，这里补上统一的错误体
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return ApiError::deadline_exceeded().into_response();
    }
    response
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_chat(
    State(state): State<AppState>,
    payload: Result<Json<CreateChatPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let chat_id = state
        .chat_service
        .create_chat(CreateChatRequest {
            name: payload.chat_name,
            user_ids: payload.users_id,
        })
        .await?;

    tracing::info!(chat_id = %chat_id, "chat created");
    Ok((StatusCode::CREATED, Json(IdResponse { id: chat_id.value() })))
}

async fn delete_chat(
    State(state): State<AppState>,
    path: Result<Path<ChatPath>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(path) = path?;
    path.validate()?;

    let chat_id = ChatId::new(path.id);
    state.chat_service.delete_chat(chat_id).await?;

    tracing::info!(chat_id = %chat_id, "chat deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessagePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;
    let timestamp = payload
        .timestamp
        .ok_or_else(|| ApiError::invalid_argument("timestamp is required"))?;

    let message_id = state
        .chat_service
        .send_message(SendMessageRequest {
            sender_id: payload.from,
            text: payload.text,
            timestamp,
        })
        .await?;

    tracing::info!(message_id = %message_id, "message sent");
    Ok((StatusCode::CREATED, Json(IdResponse { id: message_id.value() })))
}
