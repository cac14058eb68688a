//! Billing HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::sales::{RecordSaleInput, SalesService};
use crate::AppState;

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<RecordSaleInput>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.record_sale(user.client_id, user.user_id, input).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<i64>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.get_sale(user.client_id, sale_id).await {
        Ok(sale) => (StatusCode::OK, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Look up a bill by its printed number
pub async fn get_sale_by_bill_number(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(bill_number): Path<String>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.get_sale_by_bill_number(user.client_id, &bill_number).await {
        Ok(sale) => (StatusCode::OK, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}
