//! Refund HTTP handlers
//!
//! Any authenticated user may request a refund; approval and rejection are
//! limited to admins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::{require_privileged, CurrentUser};
use crate::services::refund::{CreateRefundInput, RefundService, RejectRefundInput};
use crate::AppState;

/// Request a full or partial refund
pub async fn create_refund(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateRefundInput>,
) -> impl IntoResponse {
    let service = RefundService::new(state.db.clone());

    match service.create_refund(user.client_id, user.user_id, input).await {
        Ok(refund) => (StatusCode::CREATED, Json(refund)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_refund(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(refund_id): Path<i64>,
) -> impl IntoResponse {
    let service = RefundService::new(state.db.clone());

    match service.get_refund(user.client_id, refund_id).await {
        Ok(refund) => (StatusCode::OK, Json(refund)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Approve a pending refund and put its quantities back into stock
pub async fn approve_refund(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(refund_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(e) = require_privileged(&user) {
        return e.into_response();
    }

    let service = RefundService::new(state.db.clone());

    match service.approve_refund(user.client_id, user.user_id, refund_id).await {
        Ok(refund) => (StatusCode::OK, Json(refund)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reject a pending refund; remarks are required
pub async fn reject_refund(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(refund_id): Path<i64>,
    Json(input): Json<RejectRefundInput>,
) -> impl IntoResponse {
    if let Err(e) = require_privileged(&user) {
        return e.into_response();
    }

    let service = RefundService::new(state.db.clone());

    match service
        .reject_refund(user.client_id, user.user_id, refund_id, input)
        .await
    {
        Ok(refund) => (StatusCode::OK, Json(refund)).into_response(),
        Err(e) => e.into_response(),
    }
}
