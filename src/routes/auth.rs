//! Auth routes. Static /auth paths take precedence over the parameterized
//! entity tree they share /api with.

use crate::handlers::auth;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
}
