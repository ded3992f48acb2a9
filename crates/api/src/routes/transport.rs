use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments/:id/pickup",
            post(handlers::transport::request_pickup),
        )
        .route(
            "/api/appointments/:id/transport/dispatch",
            post(handlers::transport::dispatch_transport),
        )
        .route(
            "/api/appointments/:id/transport/arrive",
            post(handlers::transport::mark_arrived),
        )
        .route(
            "/api/appointments/:id/transport/pickup",
            post(handlers::transport::mark_picked_up),
        )
        .route(
            "/api/appointments/:id/transport/complete",
            post(handlers::transport::complete_transport),
        )
        .route(
            "/api/drivers/:id/available",
            post(handlers::transport::mark_driver_available),
        )
        .route(
            "/api/drivers/:id/queue-position",
            get(handlers::transport::queue_position),
        )
}
