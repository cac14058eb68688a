//! Purchase (GRN) HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::purchase::{PurchaseReturnInput, PurchaseService, SavePurchaseInput};
use crate::AppState;

/// Save a GRN as draft or confirm it
pub async fn save_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SavePurchaseInput>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.save_purchase(user.client_id, user.user_id, input).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a purchase with its lines
pub async fn get_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(purchase_id): Path<i64>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.get_purchase(user.client_id, purchase_id).await {
        Ok(purchase) => (StatusCode::OK, Json(purchase)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Return goods from a confirmed GRN to its supplier
pub async fn create_purchase_return(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<PurchaseReturnInput>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.return_purchase(user.client_id, user.user_id, input).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}
