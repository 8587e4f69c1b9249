pub mod routes;
pub mod stream;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::relay::TickRelay;

/// Build the control and streaming router.
pub fn router(relay: Arc<TickRelay>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/mode", get(routes::get_mode).post(routes::set_mode))
        .route("/price", get(routes::get_price))
        .route("/direction", post(routes::set_direction))
        .route("/ws", get(stream::ws_handler))
        .with_state(relay)
}
