//! Vendor and supplier ledger HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::supplier_ledger::{
    CreateVendorInput, SupplierLedgerService, VendorPaymentInput,
};
use crate::AppState;

pub async fn create_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateVendorInput>,
) -> impl IntoResponse {
    let service = SupplierLedgerService::new(state.db.clone());

    match service.create_vendor(user.client_id, user.user_id, input).await {
        Ok(vendor) => (StatusCode::CREATED, Json(vendor)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<i64>,
) -> impl IntoResponse {
    let service = SupplierLedgerService::new(state.db.clone());

    match service.get_vendor(user.client_id, vendor_id).await {
        Ok(vendor) => (StatusCode::OK, Json(vendor)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Pay a vendor; books a PAYMENT ledger entry
pub async fn record_vendor_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<i64>,
    Json(input): Json<VendorPaymentInput>,
) -> impl IntoResponse {
    let service = SupplierLedgerService::new(state.db.clone());

    match service
        .record_payment(user.client_id, user.user_id, vendor_id, input)
        .await
    {
        Ok(payment) => (StatusCode::CREATED, Json(payment)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Latest running balance for a vendor
pub async fn get_vendor_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<i64>,
) -> impl IntoResponse {
    let service = SupplierLedgerService::new(state.db.clone());

    match service.get_balance(user.client_id, vendor_id).await {
        Ok(balance) => (StatusCode::OK, Json(balance)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_vendor_ledger(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(vendor_id): Path<i64>,
) -> impl IntoResponse {
    let service = SupplierLedgerService::new(state.db.clone());

    match service.get_ledger(user.client_id, vendor_id).await {
        Ok(ledger) => (StatusCode::OK, Json(ledger)).into_response(),
        Err(e) => e.into_response(),
    }
}
