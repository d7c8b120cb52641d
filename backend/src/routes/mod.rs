//! Route definitions for the restaurant back office API

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
        .merge(protected_routes(state))
}

/// Everything behind a bearer token
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/branches",
            get(handlers::list_branches).post(handlers::create_branch),
        )
        .nest("/branches/:branch_id", branch_scoped_routes())
        .route("/ingredient-categories", post(handlers::create_category))
        .nest("/ingredients", ingredient_routes())
        .nest("/vendors", vendor_routes())
        .nest("/purchases", purchase_routes())
        .nest("/vendor-payments", vendor_payment_routes())
        .nest("/expenses", expense_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Listings and stock operations scoped to one branch
fn branch_scoped_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredient-categories", get(handlers::list_categories))
        .route("/ingredients", get(handlers::list_ingredients))
        .route("/vendors", get(handlers::list_vendors))
        .route("/purchases", get(handlers::list_purchases))
        .route("/vendor-payments", get(handlers::list_vendor_payments))
        .route("/expenses", get(handlers::list_expenses))
        .route("/stock", get(handlers::list_stock))
        .route("/stock/adjust", put(handlers::adjust_stock))
        .route("/stock/low", get(handlers::list_low_stock))
        .route("/stock/movements", get(handlers::list_stock_movements))
}

fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_ingredient))
        .route(
            "/:id",
            get(handlers::get_ingredient)
                .put(handlers::update_ingredient)
                .delete(handlers::delete_ingredient),
        )
}

fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_vendor))
        .route(
            "/:id",
            get(handlers::get_vendor)
                .put(handlers::update_vendor)
                .delete(handlers::delete_vendor),
        )
        .route("/:id/outstanding", get(handlers::get_vendor_outstanding))
}

fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_purchase))
        .route(
            "/:id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .delete(handlers::delete_purchase),
        )
}

fn vendor_payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_vendor_payment))
        .route("/:id", get(handlers::get_vendor_payment))
}

fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_expense))
        .route(
            "/:id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
}
