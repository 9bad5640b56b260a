use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::requests::SendPushRequest;
use crate::services::{MulticastMessage, MulticastResponse};
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct SendPushResponse {
    pub status: bool,
    pub message: String,
    pub data: MulticastResponse,
}

#[tracing::instrument(skip(state, payload))]
pub async fn send_push(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<SendPushResponse>), AppError> {
    let request = SendPushRequest::validate(&payload).map_err(|errors| {
        tracing::warn!(errors = %errors, "Push request failed validation");
        AppError::from(errors)
    })?;

    let message = MulticastMessage {
        title: request.title,
        body: request.body,
        tokens: request.fcm_tokens,
        data: request.data,
    };

    let response = match state.push_provider.send_multicast(&message).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to send push notification");
            return Err(e.into());
        }
    };

    // Overall status mirrors the first token's outcome; the full
    // per-token array always rides along under `data`.
    let delivered = response.first_delivered();
    let message = if delivered {
        "Push notification sent successfully"
    } else {
        "Failed to send push notification"
    };

    tracing::info!(
        success_count = response.success_count,
        failure_count = response.failure_count,
        status = delivered,
        "Push dispatch complete"
    );

    Ok((
        StatusCode::OK,
        Json(SendPushResponse {
            status: delivered,
            message: message.to_string(),
            data: response,
        }),
    ))
}
