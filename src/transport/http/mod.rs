pub mod admin;
pub mod appointments;
pub mod auth;
pub mod catalog;
pub mod errors;
pub mod extract;
pub mod identity;
pub mod orders;
pub mod payments;

use {
    crate::AppState,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, patch, post},
    },
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
};

pub fn router(state: AppState) -> Router {
    let timeout = state.settings.request_timeout;

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/api/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/api/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route("/api/orders", get(orders::list_mine).post(orders::create))
        .route(
            "/api/services",
            get(appointments::list_services).post(appointments::create_service),
        )
        .route(
            "/api/vehicles",
            get(appointments::list_vehicles).post(appointments::add_vehicle),
        )
        .route(
            "/api/appointments",
            get(appointments::list_mine).post(appointments::book),
        )
        .route("/api/appointments/{id}/cancel", post(appointments::cancel))
        .route("/api/payments/esewa", post(payments::initiate))
        .route("/api/payments/esewa/success", get(payments::success))
        .route("/api/payments/esewa/failure", get(payments::failure))
        .route("/api/admin/orders", get(admin::list_orders))
        .route(
            "/api/admin/orders/{id}",
            get(admin::get_order).patch(admin::update_order_status),
        )
        .route("/api/admin/appointments", get(appointments::admin_list))
        .route(
            "/api/admin/appointments/{id}",
            patch(appointments::admin_update_status),
        )
        .route(
            "/api/webhooks/identity",
            post(identity::identity_webhook_handler),
        )
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
