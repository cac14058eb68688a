//! Route definitions for the pharmacy POS API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Password reset (public)
        .nest("/auth", auth_routes())
        // Everything else requires a bearer token
        .merge(protected_routes(state))
}

/// Password reset routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/password-reset/request", post(handlers::request_password_reset))
        .route("/password-reset/confirm", post(handlers::reset_password))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/medicines", medicine_routes())
        .nest("/vendors", vendor_routes())
        .nest("/purchases", purchase_routes())
        .nest("/sales", sales_routes())
        .nest("/refunds", refund_routes())
        .nest("/karobar", karobar_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Medicine catalog routes
fn medicine_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_medicine))
        .route("/stock", post(handlers::add_stock))
        .route("/:medicine_id", get(handlers::get_medicine))
        .route("/:medicine_id/stock", get(handlers::get_medicine_stock))
}

/// Vendor and supplier ledger routes
fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_vendor))
        .route("/:vendor_id", get(handlers::get_vendor))
        .route("/:vendor_id/payments", post(handlers::record_vendor_payment))
        .route("/:vendor_id/balance", get(handlers::get_vendor_balance))
        .route("/:vendor_id/ledger", get(handlers::get_vendor_ledger))
}

/// Purchase (GRN) routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::save_purchase))
        .route("/returns", post(handlers::create_purchase_return))
        .route("/:purchase_id", get(handlers::get_purchase))
}

/// Billing routes
fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_sale))
        .route("/:sale_id", get(handlers::get_sale))
        .route("/bill/:bill_number", get(handlers::get_sale_by_bill_number))
}

/// Refund routes
fn refund_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_refund))
        .route("/:refund_id", get(handlers::get_refund))
        .route("/:refund_id/approve", post(handlers::approve_refund))
        .route("/:refund_id/reject", post(handlers::reject_refund))
}

/// Karobar account and statement routes
fn karobar_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(handlers::create_account))
        .route("/accounts/:account_id", get(handlers::get_account))
        .route("/accounts/:account_id/status", put(handlers::set_account_status))
        .route("/accounts/:account_id/statements", get(handlers::list_statements))
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/categories/defaults", post(handlers::seed_default_categories))
        .route("/transactions", post(handlers::post_transaction))
        .route("/statements/:statement_id/delete", post(handlers::delete_statement))
}
