use chrono::Utc;
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use caresync_core::models::appointment::CreateAppointmentRequest;

use crate::models::DbAppointment;

pub(crate) const APPOINTMENT_COLUMNS: &str = r#"
    id, client_id, scheduled_date, start_time, end_time, location,
    provider_ids, driver_id, group_size, requires_car, status, respond_by,
    pickup_urgency, pickup_notes, rejected_by_role, rejected_by_id,
    rejection_reason, created_at, provider_accepted_at, driver_accepted_at,
    session_started_at, session_ended_at, pickup_requested_at,
    pickup_confirmed_at, rejected_at, auto_cancelled_at, transport_completed_at
"#;

pub async fn create_appointment(
    pool: &Pool<Postgres>,
    req: &CreateAppointmentRequest,
) -> Result<DbAppointment> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!(
        "Creating appointment: id={}, client={}, group_size={}, requires_car={}",
        id,
        req.client_id,
        req.group_size,
        req.requires_car
    );

    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        INSERT INTO appointments (
            id, client_id, scheduled_date, start_time, end_time, location,
            provider_ids, group_size, requires_car, status, respond_by, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(req.client_id)
    .bind(req.scheduled_date)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(&req.location)
    .bind(&req.provider_ids)
    .bind(req.group_size)
    .bind(req.requires_car)
    .bind(req.respond_by)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(appointment)
}

pub async fn get_appointment_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE id = $1
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

/// Row-locked load used by the transition engine. Every transition
/// revalidates against the state this returns, never a cached copy.
pub async fn lock_appointment(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE id = $1
        FOR UPDATE
        "#
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(appointment)
}
