use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use caresync_core::{
    errors::CoordError,
    models::appointment::{RequestPickupRequest, TransitionResponse, TransportStepRequest},
    models::driver::{DriverAvailabilityEntry, QueuePositionResponse},
};

use crate::{middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn request_pickup(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RequestPickupRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) = caresync_db::repositories::lifecycle::request_pickup(
        &state.db_pool,
        id,
        payload.party,
        payload.urgency,
        payload.notes.as_deref(),
    )
    .await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

/// Assigns a return driver from the queue head. Retryable on
/// `NoDriverAvailable`, like the outbound assignment.
#[axum::debug_handler]
pub async fn dispatch_transport(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) =
        caresync_db::repositories::lifecycle::dispatch_transport(&state.db_pool, id).await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

#[axum::debug_handler]
pub async fn mark_arrived(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransportStepRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) =
        caresync_db::repositories::lifecycle::mark_arrived(&state.db_pool, id, payload.party)
            .await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

#[axum::debug_handler]
pub async fn mark_picked_up(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransportStepRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) =
        caresync_db::repositories::lifecycle::mark_picked_up(&state.db_pool, id, payload.party)
            .await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

#[axum::debug_handler]
pub async fn complete_transport(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransportStepRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) =
        caresync_db::repositories::lifecycle::complete_transport(&state.db_pool, id, payload.party)
            .await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

#[axum::debug_handler]
pub async fn mark_driver_available(
    State(state): State<Arc<ApiState>>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<DriverAvailabilityEntry>, AppError> {
    let entry =
        caresync_db::repositories::lifecycle::mark_driver_available(&state.db_pool, driver_id)
            .await?;

    Ok(Json(entry))
}

/// Derived rank over the persisted availability timestamps; null when
/// the driver is not currently available.
#[axum::debug_handler]
pub async fn queue_position(
    State(state): State<Arc<ApiState>>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<QueuePositionResponse>, AppError> {
    let position =
        caresync_db::repositories::driver_pool::position_of(&state.db_pool, driver_id)
            .await
            .map_err(CoordError::Database)?;

    Ok(Json(QueuePositionResponse {
        driver_id,
        position: position.map(|p| p as usize),
    }))
}
