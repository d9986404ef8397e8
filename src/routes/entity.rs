//! Generic CRUD routes. One parameterized tree serves every configured
//! resource; per-resource operation gating happens in the handlers.

use crate::handlers::entity;
use crate::state::AppState;
use axum::routing::get;
use axum::Router;

pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:path_segment",
            get(entity::list).post(entity::create),
        )
        .route(
            "/:path_segment/:id",
            get(entity::read)
                .put(entity::update)
                .patch(entity::merge)
                .delete(entity::delete),
        )
        .route("/:path_segment/:id/:relation", get(entity::relation_index))
}
