use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use chrono::Utc;

use super::AppState;
use crate::error::ApiError;
use crate::models::{NotificationRequest, NotificationResponse};
use crate::sms::compose_message;

pub fn notification_routes() -> Router<AppState> {
    Router::new().route("/send-sms", post(send_sms))
}

async fn send_sms(
    State(state): State<AppState>,
    Json(request): Json<NotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = compose_message(&request, Utc::now());
    let receipt = state.sms.send(&text).await?;

    tracing::info!(
        group_id = %receipt.group_id,
        review_request = request.is_review_request(),
        "Notification SMS sent"
    );

    Ok(Json(NotificationResponse {
        success: true,
        message: "문자 발송 성공".to_string(),
        group_id: receipt.group_id,
    }))
}
