//! Route definitions for the Gelateria Management Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - ingredient catalog
        .nest("/ingredients", ingredient_routes())
        // Protected routes - price history
        .nest("/prices", pricing_routes())
        // Protected routes - warehouse lots and movements
        .nest("/warehouse", warehouse_routes())
        // Protected routes - product catalog
        .nest("/products", product_routes())
        // Protected routes - recipes
        .nest("/recipes", recipe_routes())
        // Protected routes - production batches
        .nest("/production", production_routes())
        // Protected routes - production templates
        .nest("/templates", template_routes())
        // Protected routes - HACCP compliance logs
        .nest("/haccp", haccp_routes())
        // Protected routes - audit trail
        .nest("/audit", audit_routes())
        // Protected routes - reporting
        .nest("/reports", reporting_routes())
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Ingredient catalog routes (protected)
fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_ingredients).post(handlers::create_ingredient))
        .route(
            "/:ingredient_id",
            get(handlers::get_ingredient)
                .put(handlers::update_ingredient)
                .delete(handlers::delete_ingredient),
        )
        .route("/:ingredient_id/price", get(handlers::get_current_price))
        .route("/:ingredient_id/prices", get(handlers::get_price_history))
        .route("/:ingredient_id/lots", get(handlers::get_available_lots))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Price history routes (protected)
fn pricing_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::record_price))
        .route("/extract-invoice", post(handlers::extract_invoice))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Warehouse routes (protected)
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        // Lots
        .route("/lots", get(handlers::list_lots).post(handlers::create_lot))
        .route("/lots/:lot_id", get(handlers::get_lot).put(handlers::update_lot))
        .route("/lots/:lot_id/validate", get(handlers::validate_lot))
        .route("/lots/:lot_id/deduct", post(handlers::deduct_from_lot))
        .route("/lots/:lot_id/movements", get(handlers::get_lot_movements))
        // Movement ledger
        .route("/movements", get(handlers::list_movements))
        // Stock levels
        .route("/stock", get(handlers::get_stock_levels))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/recipe", get(handlers::get_recipe_for_product))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Recipe routes (protected)
fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_recipes).post(handlers::create_recipe))
        .route(
            "/:recipe_id",
            get(handlers::get_recipe)
                .put(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Production batch routes (protected)
fn production_routes() -> Router<AppState> {
    Router::new()
        .route("/batches", get(handlers::list_batches).post(handlers::create_batch))
        .route("/batches/incomplete", get(handlers::list_incomplete_batches))
        .route("/batches/:batch_id", get(handlers::get_batch))
        .route("/batches/:batch_id/resume", post(handlers::resume_batch))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Production template routes (protected)
fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_templates).post(handlers::create_template))
        .route(
            "/:template_id",
            get(handlers::get_template)
                .put(handlers::update_template)
                .delete(handlers::delete_template),
        )
        .route("/:template_id/validate", get(handlers::validate_template))
        .route("/:template_id/apply", post(handlers::apply_template))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// HACCP compliance routes (protected)
fn haccp_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/temperatures",
            get(handlers::list_temperatures).post(handlers::record_temperature),
        )
        .route("/temperatures/:log_id/void", put(handlers::void_temperature))
        .route(
            "/cleanings",
            get(handlers::list_cleanings).post(handlers::record_cleaning),
        )
        .route("/cleanings/:log_id/void", put(handlers::void_cleaning))
        .route("/auto-fill", post(handlers::auto_fill))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Audit trail routes (protected)
fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_audit_entries))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Reporting routes (protected)
fn reporting_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/traceability", get(handlers::get_traceability_report))
        .route("/haccp/temperatures", get(handlers::get_temperature_register))
        .route_layer(middleware::from_fn(auth_middleware))
}
