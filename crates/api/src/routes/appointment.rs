use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments",
            post(handlers::appointment::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointment::get_appointment),
        )
        .route(
            "/api/appointments/:id/accept",
            post(handlers::appointment::accept_as_provider),
        )
        .route(
            "/api/appointments/:id/confirm",
            post(handlers::appointment::confirm),
        )
        .route(
            "/api/appointments/:id/reject",
            post(handlers::appointment::reject),
        )
        .route(
            "/api/appointments/:id/assign-driver",
            post(handlers::appointment::assign_driver),
        )
        .route(
            "/api/appointments/:id/start",
            post(handlers::appointment::start_session),
        )
        .route(
            "/api/appointments/:id/complete",
            post(handlers::appointment::complete),
        )
}
