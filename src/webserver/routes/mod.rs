use crate::webserver::state::AppState;
use axum::Router;
use std::sync::Arc;

pub mod api;
pub mod pages;
pub mod ws;

pub fn create_router(state: Arc<AppState>) -> Router {
    let public_dir = state.config.public_dir.clone();

    Router::new()
        .merge(ws::routes())
        .merge(pages::routes(&public_dir))
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(api::routes())
}
