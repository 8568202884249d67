/// Page and static asset routes
use crate::webserver::state::AppState;
use axum::{http::StatusCode, routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

pub fn routes(public_dir: &str) -> Router<Arc<AppState>> {
    let public = Path::new(public_dir);

    Router::new()
        .route_service("/", ServeFile::new(public.join("index.html")))
        .route_service("/dashboard", ServeFile::new(public.join("dashboard.html")))
        .nest_service("/public", ServeDir::new(public))
        .route("/favicon.ico", get(favicon))
}

/// Browsers ask for it on every page load
async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}
