//! HTTP and command-line front end for the report service

pub mod api;
pub mod cli;
pub mod error;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use state::AppState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let reports = Router::new()
        .route("/upload", post(api::upload))
        .route("/list", get(api::list))
        .route("/delete/:name", delete(api::delete))
        .route("/fields/:name", get(api::fields))
        .route("/export", post(api::export))
        .route("/export-pdf-with-data", post(api::export_pdf))
        .route("/export-html-with-data", post(api::export_html))
        .route("/health", get(api::health));

    let body_limit = state.body_limit();
    Router::new()
        .route("/health", get(api::health))
        .nest("/api/reports", reports)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
