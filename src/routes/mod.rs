pub mod auth;
pub mod common;
pub mod entity;

use crate::state::AppState;
use axum::Router;

/// Full application router: operational routes at the root, auth and
/// generic entity routes under /api.
pub fn api_router(state: AppState) -> Router {
    let api = auth::auth_routes().merge(entity::entity_routes());
    Router::new()
        .merge(common::common_routes())
        .nest("/api", api)
        .with_state(state)
}
