use axum::Router;

use crate::state::SharedState;

pub mod catalog;
pub mod docs;
pub mod fixtures;
pub mod health;
pub mod pools;
pub mod session;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(fixtures::router())
        .merge(session::router(state.clone()))
        .merge(pools::router(state.clone()))
        .merge(catalog::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
