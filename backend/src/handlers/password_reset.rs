//! Password reset HTTP handlers (public)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::services::password_reset::{
    PasswordResetService, RequestResetInput, ResetPasswordInput,
};
use crate::AppState;

/// Send a reset code to the user's phone
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(input): Json<RequestResetInput>,
) -> impl IntoResponse {
    let service =
        PasswordResetService::new(state.db.clone(), state.config.password_reset.clone());

    match service.request_reset(input).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordInput>,
) -> impl IntoResponse {
    let service =
        PasswordResetService::new(state.db.clone(), state.config.password_reset.clone());

    match service.reset_password(input).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Password has been reset" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
