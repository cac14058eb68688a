//! Medicine catalog HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::medicine::{AddStockInput, CreateMedicineInput, MedicineService};
use crate::AppState;

pub async fn create_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateMedicineInput>,
) -> impl IntoResponse {
    let service = MedicineService::new(state.db.clone());

    match service.create_medicine(user.client_id, input).await {
        Ok(medicine) => (StatusCode::CREATED, Json(medicine)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(medicine_id): Path<i64>,
) -> impl IntoResponse {
    let service = MedicineService::new(state.db.clone());

    match service.get_medicine(user.client_id, medicine_id).await {
        Ok(medicine) => (StatusCode::OK, Json(medicine)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Medicine with its stock batches, earliest expiry first
pub async fn get_medicine_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(medicine_id): Path<i64>,
) -> impl IntoResponse {
    let service = MedicineService::new(state.db.clone());

    match service.get_medicine_stock(user.client_id, medicine_id).await {
        Ok(stock) => (StatusCode::OK, Json(stock)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Enter stock directly, outside a GRN
pub async fn add_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddStockInput>,
) -> impl IntoResponse {
    let service = MedicineService::new(state.db.clone());

    match service.add_stock(user.client_id, user.user_id, input).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}
