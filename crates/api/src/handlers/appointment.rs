use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use caresync_core::{
    errors::CoordError,
    lifecycle,
    models::appointment::{
        AcceptRequest, Appointment, AppointmentDetailResponse, CompleteRequest, ConfirmRequest,
        ConfirmResponse, CreateAppointmentRequest, RejectRequest, StartRequest,
        TransitionResponse,
    },
};

use crate::{middleware::error_handling::AppError, ApiState};

/// Entry point of the booking workflow: appointments are created in
/// `pending` and mutated exclusively through the transition handlers
/// below.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    lifecycle::validate_new_booking(
        payload.group_size,
        payload.requires_car,
        payload.provider_ids.len(),
    )?;
    if payload.end_time <= payload.start_time {
        return Err(AppError(CoordError::Validation(
            "end_time must be after start_time".to_string(),
        )));
    }

    let appointment =
        caresync_db::repositories::appointment::create_appointment(&state.db_pool, &payload)
            .await
            .map_err(CoordError::Database)?;

    Ok(Json(appointment.into_core().map_err(CoordError::Database)?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDetailResponse>, AppError> {
    let appointment =
        caresync_db::repositories::appointment::get_appointment_by_id(&state.db_pool, id)
            .await
            .map_err(CoordError::Database)?
            .ok_or_else(|| CoordError::NotFound(format!("appointment {id}")))?
            .into_core()
            .map_err(CoordError::Database)?;

    let confirmations =
        caresync_db::repositories::confirmation::list_for_appointment_pool(&state.db_pool, id)
            .await
            .map_err(CoordError::Database)?
            .into_iter()
            .map(|r| r.into_core())
            .collect::<eyre::Result<Vec<_>>>()
            .map_err(CoordError::Database)?;

    let fully_confirmed = lifecycle::is_fully_confirmed(
        &confirmations,
        appointment.group_size,
        appointment.requires_car,
        appointment.driver_id,
    );

    Ok(Json(AppointmentDetailResponse {
        appointment,
        confirmations,
        fully_confirmed,
    }))
}

#[axum::debug_handler]
pub async fn accept_as_provider(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) = caresync_db::repositories::lifecycle::accept_as_provider(
        &state.db_pool,
        id,
        payload.provider_id,
    )
    .await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

#[axum::debug_handler]
pub async fn confirm(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let (appointment, event, outcome) =
        caresync_db::repositories::lifecycle::confirm_party(&state.db_pool, id, payload.party)
            .await?;

    Ok(Json(ConfirmResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        outcome,
        event,
    }))
}

#[axum::debug_handler]
pub async fn reject(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) = caresync_db::repositories::lifecycle::reject(
        &state.db_pool,
        id,
        payload.party,
        &payload.reason,
    )
    .await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

/// Drives `confirmed -> driver_assigned`. A `NoDriverAvailable` answer
/// is retryable: the appointment stays `confirmed` and the external
/// scheduler calls this again.
#[axum::debug_handler]
pub async fn assign_driver(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) =
        caresync_db::repositories::lifecycle::assign_driver(&state.db_pool, id).await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) =
        caresync_db::repositories::lifecycle::start_session(&state.db_pool, id, payload.party)
            .await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}

#[axum::debug_handler]
pub async fn complete(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let (appointment, event) =
        caresync_db::repositories::lifecycle::complete(&state.db_pool, id, payload.party).await?;

    Ok(Json(TransitionResponse {
        appointment_id: appointment.id,
        status: appointment.status,
        event: Some(event),
    }))
}
