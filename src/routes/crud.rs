//! CRUD routes: POST /:action, GET /fields.

use crate::handlers::{call_action, model_fields};
use crate::state::CrudState;
use crate::store::ModelStore;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

pub fn crud_routes<S: ModelStore + 'static>(state: CrudState<S>, body_limit: usize) -> Router {
    Router::new()
        .route("/fields", get(model_fields::<S>))
        .route("/:action", post(call_action::<S>))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
