use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use caresync_core::{
    errors::CoordError,
    models::material::{
        AvailabilityResponse, DeductMaterialsRequest, MaterialUsageRecord, ReturnMaterialRequest,
    },
};

use crate::{middleware::error_handling::AppError, ApiState};

/// Deduct materials against an appointment. All-or-nothing across the
/// request; a shortfall on any line applies nothing.
#[axum::debug_handler]
pub async fn deduct_materials(
    State(state): State<Arc<ApiState>>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<DeductMaterialsRequest>,
) -> Result<Json<Vec<MaterialUsageRecord>>, AppError> {
    let usages = caresync_db::repositories::inventory::deduct(
        &state.db_pool,
        appointment_id,
        &payload.lines,
    )
    .await?
    .into_iter()
    .map(|u| u.into_core())
    .collect::<eyre::Result<Vec<_>>>()
    .map_err(CoordError::Database)?;

    Ok(Json(usages))
}

#[axum::debug_handler]
pub async fn list_usages(
    State(state): State<Arc<ApiState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Vec<MaterialUsageRecord>>, AppError> {
    let usages = caresync_db::repositories::inventory::list_usages_for_appointment(
        &state.db_pool,
        appointment_id,
    )
    .await?
    .into_iter()
    .map(|u| u.into_core())
    .collect::<eyre::Result<Vec<_>>>()
    .map_err(CoordError::Database)?;

    Ok(Json(usages))
}

/// Return previously deducted reusable usage outside the completion
/// path (early hand-back from the inventory UI). Consumable usage is
/// never returnable.
#[axum::debug_handler]
pub async fn return_material(
    State(state): State<Arc<ApiState>>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<ReturnMaterialRequest>,
) -> Result<Json<Vec<MaterialUsageRecord>>, AppError> {
    caresync_db::repositories::inventory::return_usage(
        &state.db_pool,
        appointment_id,
        payload.material_id,
        payload.quantity,
    )
    .await?;

    let usages = caresync_db::repositories::inventory::list_usages_for_appointment(
        &state.db_pool,
        appointment_id,
    )
    .await?
    .into_iter()
    .map(|u| u.into_core())
    .collect::<eyre::Result<Vec<_>>>()
    .map_err(CoordError::Database)?;

    Ok(Json(usages))
}

#[axum::debug_handler]
pub async fn current_availability(
    State(state): State<Arc<ApiState>>,
    Path(material_id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let material =
        caresync_db::repositories::inventory::current_availability(&state.db_pool, material_id)
            .await?;

    Ok(Json(AvailabilityResponse {
        material_id: material.id,
        available: material.available,
        in_use: material.in_use,
    }))
}
