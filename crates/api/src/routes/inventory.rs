use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments/:id/materials",
            post(handlers::inventory::deduct_materials).get(handlers::inventory::list_usages),
        )
        .route(
            "/api/appointments/:id/materials/return",
            post(handlers::inventory::return_material),
        )
        .route(
            "/api/materials/:id/availability",
            get(handlers::inventory::current_availability),
        )
}
