//! Karobar account HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::AccountStatus;

use crate::middleware::{require_privileged, CurrentUser};
use crate::services::karobar::{
    CreateAccountInput, CreateCategoryInput, DeleteStatementInput, KarobarService,
    PostTransactionInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AccountStatusInput {
    pub status: AccountStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatementQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

/// Open a new account
pub async fn create_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateAccountInput>,
) -> impl IntoResponse {
    let service = KarobarService::new(state.db.clone());

    match service.create_account(user.client_id, input).await {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(account_id): Path<i64>,
) -> impl IntoResponse {
    let service = KarobarService::new(state.db.clone());

    match service.get_account(user.client_id, account_id).await {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Activate or deactivate an account (admin only)
pub async fn set_account_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(account_id): Path<i64>,
    Json(input): Json<AccountStatusInput>,
) -> impl IntoResponse {
    if let Err(e) = require_privileged(&user) {
        return e.into_response();
    }

    let service = KarobarService::new(state.db.clone());

    match service
        .set_account_status(user.client_id, account_id, input.status)
        .await
    {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let service = KarobarService::new(state.db.clone());

    match service.list_categories(user.client_id).await {
        Ok(categories) => {
            (StatusCode::OK, Json(serde_json::json!({ "categories": categories }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> impl IntoResponse {
    let service = KarobarService::new(state.db.clone());

    match service.create_category(user.client_id, input).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create the standard categories missing for this client
pub async fn seed_default_categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let service = KarobarService::new(state.db.clone());

    match service.seed_default_categories(user.client_id).await {
        Ok(categories) => {
            (StatusCode::OK, Json(serde_json::json!({ "categories": categories }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Post an IN/OUT transaction
pub async fn post_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<PostTransactionInput>,
) -> impl IntoResponse {
    let service = KarobarService::new(state.db.clone());

    match service
        .post_transaction(user.client_id, user.user_id, user.is_privileged(), input)
        .await
    {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_statements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(account_id): Path<i64>,
    Query(query): Query<StatementQuery>,
) -> impl IntoResponse {
    let service = KarobarService::new(state.db.clone());

    match service
        .list_statements(user.client_id, account_id, query.include_deleted)
        .await
    {
        Ok(statements) => {
            (StatusCode::OK, Json(serde_json::json!({ "statements": statements }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Delete a statement and recompute the account balance (admin only)
pub async fn delete_statement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(statement_id): Path<i64>,
    Json(input): Json<DeleteStatementInput>,
) -> impl IntoResponse {
    if let Err(e) = require_privileged(&user) {
        return e.into_response();
    }

    let service = KarobarService::new(state.db.clone());

    match service
        .delete_statement(user.client_id, user.user_id, statement_id, input)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}
