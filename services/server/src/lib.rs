pub mod auth;
pub mod config;
pub mod deliver;
pub mod http;
pub mod keys;
pub mod leadership;
pub mod reaper;
pub mod registry;
pub mod router;
pub mod state;

pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/signal", get(router::signal_ws_handler))
        .route("/client-id", post(http::client_id::post_client_id))
        .route(
            "/controller/status",
            get(http::controller_status::get_controller_status),
        )
        .route(
            "/controller/lock",
            post(http::controller_lock::post_controller_lock)
                .get(http::controller_lock::get_controller_lock)
                .delete(http::controller_lock::delete_controller_lock),
        )
        .route(
            "/controller/clear",
            get(http::controller_clear::get_controller_clear),
        )
        .route("/ice-servers", get(http::ice_servers::get_ice_servers))
        .route("/healthz", get(http::health::healthz))
        .route("/readyz", get(http::health::readyz))
        .route("/metrics", get(http::health::metrics))
        .fallback(fallback_404)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html("<!DOCTYPE html><html><head><title>404</title></head><body><p>This page doesn't exist.</p></body></html>"),
    )
}
