//! Defines routes for the notification gateway.
//!
//! ## Structure
//! - `POST /`         -> storage notification endpoint
//! - `GET  /healthz`  -> liveness
//! - `GET  /{*path}`  -> diagnostic echo of the request path (also `GET /`)

use crate::{
    handlers::{
        health_handlers::healthz,
        notification_handlers::{echo_path, receive_notification},
    },
    services::event_processor::EventProcessor,
};
use axum::{Router, routing::get};

/// Build and return the router.
///
/// The router carries shared state (`EventProcessor`) to all handlers.
pub fn routes() -> Router<EventProcessor> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(echo_path).post(receive_notification))
        .route("/{*path}", get(echo_path))
}
