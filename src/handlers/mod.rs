pub mod dashboard;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .route("/api/products/{key}/series", get(dashboard::get_product_series))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
