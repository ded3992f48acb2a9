//! The transition engine. Every public function here executes exactly
//! one appointment state transition as one database transaction: the
//! appointment row is locked, the pure rules from `caresync_core` are
//! consulted against current state, mutations and side effects are
//! applied, and a status event is recorded before commit. A failure at
//! any point rolls the whole transition back.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use caresync_core::errors::{CoordError, CoordResult};
use caresync_core::lifecycle;
use caresync_core::models::appointment::{Appointment, AppointmentStatus, PickupUrgency};
use caresync_core::models::driver::DriverAvailabilityEntry;
use caresync_core::models::event::StatusChange;
use caresync_core::models::party::{Actor, ConfirmOutcome, RequiredParty};

use crate::models::DbAppointment;
use crate::repositories::appointment::APPOINTMENT_COLUMNS;
use crate::repositories::{confirmation, db_err, driver_pool, inventory};
use crate::DbPool;

/// First provider acceptance: moves the booking out of `pending` and
/// opens a confirmation record for every assigned provider. The driver
/// slot is opened later, at assignment, once a driver exists.
pub async fn accept_as_provider(
    pool: &DbPool,
    appointment_id: Uuid,
    provider_id: Uuid,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    lifecycle::guard(status, &[AppointmentStatus::Pending], "accept")?;
    if !appointment.is_assigned_provider(provider_id) {
        return Err(CoordError::Forbidden(format!(
            "provider {provider_id} is not assigned to appointment {appointment_id}"
        )));
    }
    if !lifecycle::confirmation_window_open(now, appointment.respond_by) {
        return Err(CoordError::WindowClosed(format!(
            "response deadline for appointment {appointment_id} has passed"
        )));
    }

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'awaiting_confirmation', provider_accepted_at = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    for pid in &appointment.provider_ids {
        confirmation::require_confirmation(&mut tx, appointment_id, RequiredParty::Provider(*pid))
            .await?;
    }

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::AwaitingConfirmation,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Appointment {} accepted by provider {}, awaiting {} confirmation(s)",
        appointment_id,
        provider_id,
        appointment.group_size
    );
    Ok((updated.into_core()?, event))
}

/// A required party confirms. Provider confirmations accumulate until
/// the group threshold is met; the transition collapses through
/// `confirmed` straight to `ready` for bookings that need no car.
/// Driver confirmation moves `driver_assigned` to `ready`. Retries are
/// idempotent no-ops.
pub async fn confirm_party(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
) -> CoordResult<(Appointment, Option<StatusChange>, ConfirmOutcome)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    // A confirmation landing after the deadline loses even if the sweep
    // has not physically run yet.
    if status == AppointmentStatus::AutoCancelled
        || (status.is_awaiting_response()
            && !lifecycle::confirmation_window_open(now, appointment.respond_by))
    {
        return Err(CoordError::WindowClosed(format!(
            "appointment {appointment_id} can no longer be confirmed"
        )));
    }

    lifecycle::authorize(&actor, &appointment)?;
    lifecycle::guard(
        status,
        &[
            AppointmentStatus::AwaitingConfirmation,
            AppointmentStatus::DriverAssigned,
        ],
        "confirm",
    )?;

    let party = lifecycle::confirming_party(&actor, &appointment)?;
    let outcome = confirmation::stamp_confirmation(&mut tx, appointment_id, party, now)
        .await?
        .ok_or_else(|| {
            CoordError::UnknownParty(format!(
                "{} {} was never required on appointment {appointment_id}",
                party.role(),
                party.party_id()
            ))
        })?;

    if outcome == ConfirmOutcome::AlreadyConfirmed {
        tx.commit().await.map_err(db_err)?;
        return Ok((appointment, None, outcome));
    }

    let (updated, event) = match party {
        RequiredParty::Provider(_) => {
            let records = confirmation::list_for_appointment(&mut tx, appointment_id)
                .await?
                .into_iter()
                .map(|r| r.into_core())
                .collect::<eyre::Result<Vec<_>>>()?;

            if lifecycle::providers_fully_confirmed(&records, appointment.group_size) {
                let next = lifecycle::status_after_provider_confirmation(appointment.requires_car);
                lifecycle::validate_transition(status, next, "confirm")?;
                let updated = set_status(&mut tx, appointment_id, next).await?;
                let event = record_event(&mut tx, appointment_id, status, next, now).await?;
                (updated, Some(event))
            } else {
                (None, None)
            }
        }
        RequiredParty::Driver(_) => {
            let next = AppointmentStatus::Ready;
            lifecycle::validate_transition(status, next, "confirm")?;
            let updated = sqlx::query_as::<_, DbAppointment>(&format!(
                r#"
                UPDATE appointments
                SET status = $2, driver_accepted_at = $3
                WHERE id = $1
                RETURNING {APPOINTMENT_COLUMNS}
                "#
            ))
            .bind(appointment_id)
            .bind(next.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
            let event = record_event(&mut tx, appointment_id, status, next, now).await?;
            (Some(updated), Some(event))
        }
    };

    tx.commit().await.map_err(db_err)?;

    let appointment = match updated {
        Some(row) => row.into_core()?,
        None => appointment,
    };
    if let Some(event) = &event {
        tracing::info!(
            "Appointment {} advanced {} -> {} on confirmation",
            appointment_id,
            event.from,
            event.to
        );
    }
    Ok((appointment, event, outcome))
}

/// Rejection from any non-terminal status. The reason is mandatory and
/// the rejecting party is recorded; outstanding confirmation records
/// are left unconfirmed for audit.
pub async fn reject(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
    reason: &str,
) -> CoordResult<(Appointment, StatusChange)> {
    if reason.trim().is_empty() {
        return Err(CoordError::Validation(
            "a rejection reason is required".to_string(),
        ));
    }

    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    lifecycle::authorize(&actor, &appointment)?;
    lifecycle::validate_transition(status, AppointmentStatus::Rejected, "reject")?;

    let (rejected_by_role, rejected_by_id) = match actor {
        Actor::Provider(id) => (Some("provider"), Some(id)),
        Actor::Driver(id) => (Some("driver"), Some(id)),
        Actor::Coordinator => (None, None),
    };

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'rejected', rejected_at = $2, rejected_by_role = $3,
            rejected_by_id = $4, rejection_reason = $5
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(now)
    .bind(rejected_by_role)
    .bind(rejected_by_id)
    .bind(reason)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::Rejected,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!("Appointment {} rejected from {}", appointment_id, status);
    Ok((updated.into_core()?, event))
}

/// Dequeue the head of the driver queue for a confirmed booking. On an
/// empty queue the appointment stays `confirmed` and the error is
/// retryable; the external scheduler re-drives this entry point.
pub async fn assign_driver(
    pool: &DbPool,
    appointment_id: Uuid,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;

    lifecycle::guard(status, &[AppointmentStatus::Confirmed], "assign_driver")?;
    if !row.requires_car {
        return Err(CoordError::InvalidTransition {
            from: status,
            action: "assign_driver".to_string(),
        });
    }

    let driver_id = driver_pool::assign_next(&mut tx)
        .await?
        .ok_or(CoordError::NoDriverAvailable)?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'driver_assigned', driver_id = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(driver_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    confirmation::require_confirmation(&mut tx, appointment_id, RequiredParty::Driver(driver_id))
        .await?;

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::DriverAssigned,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Driver {} assigned to appointment {}",
        driver_id,
        appointment_id
    );
    Ok((updated.into_core()?, event))
}

/// Explicit operator start. Confirmation and session start are
/// independently auditable; nothing promotes `ready` automatically.
pub async fn start_session(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    lifecycle::authorize(&actor, &appointment)?;
    lifecycle::guard(status, &[AppointmentStatus::Ready], "start")?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'in_progress', session_started_at = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::InProgress,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!("Appointment {} session started", appointment_id);
    Ok((updated.into_core()?, event))
}

/// Explicit completion. Every outstanding reusable material usage is
/// returned inside the same transaction; a ledger failure aborts the
/// transition and the appointment stays where it was.
pub async fn complete(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    lifecycle::authorize(&actor, &appointment)?;
    lifecycle::guard(
        status,
        &[
            AppointmentStatus::InProgress,
            AppointmentStatus::TransportCompleted,
        ],
        "complete",
    )?;

    let returned = inventory::return_all_reusable(&mut tx, appointment_id, now).await?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'completed', session_ended_at = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::Completed,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Appointment {} completed, {} reusable usage(s) returned",
        appointment_id,
        returned
    );
    Ok((updated.into_core()?, event))
}

/// Request return transport for an in-progress session.
pub async fn request_pickup(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
    urgency: PickupUrgency,
    notes: Option<&str>,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    lifecycle::authorize(&actor, &appointment)?;
    lifecycle::guard(status, &[AppointmentStatus::InProgress], "request_pickup")?;
    if !appointment.requires_car {
        return Err(CoordError::Validation(format!(
            "appointment {appointment_id} does not use transport"
        )));
    }

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'pickup_requested', pickup_requested_at = $2,
            pickup_urgency = $3, pickup_notes = $4
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(now)
    .bind(urgency.as_str())
    .bind(notes)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::PickupRequested,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Pickup requested for appointment {} ({})",
        appointment_id,
        urgency.as_str()
    );
    Ok((updated.into_core()?, event))
}

/// Assign a return driver from the queue; it may well be a different
/// driver than the outbound one.
pub async fn dispatch_transport(
    pool: &DbPool,
    appointment_id: Uuid,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;

    lifecycle::guard(
        status,
        &[AppointmentStatus::PickupRequested],
        "dispatch_transport",
    )?;

    let driver_id = driver_pool::assign_next(&mut tx)
        .await?
        .ok_or(CoordError::NoDriverAvailable)?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'driving_to_location', driver_id = $2, pickup_confirmed_at = $3
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(driver_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::DrivingToLocation,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Return driver {} dispatched for appointment {}",
        driver_id,
        appointment_id
    );
    Ok((updated.into_core()?, event))
}

/// Driver has reached the session location.
pub async fn mark_arrived(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
) -> CoordResult<(Appointment, StatusChange)> {
    step_transport(
        pool,
        appointment_id,
        actor,
        AppointmentStatus::DrivingToLocation,
        AppointmentStatus::AtLocation,
        "arrive",
    )
    .await
}

/// Provider(s) are aboard for the return trip.
pub async fn mark_picked_up(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
) -> CoordResult<(Appointment, StatusChange)> {
    step_transport(
        pool,
        appointment_id,
        actor,
        AppointmentStatus::AtLocation,
        AppointmentStatus::ProviderPickedUp,
        "pickup",
    )
    .await
}

/// Transport leg finished. The driver re-enters the availability queue
/// here; this is the only path back to availability after assignment.
pub async fn complete_transport(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    lifecycle::authorize(&actor, &appointment)?;
    lifecycle::guard(
        status,
        &[AppointmentStatus::ProviderPickedUp],
        "complete_transport",
    )?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = 'transport_completed', transport_completed_at = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    if let Some(driver_id) = appointment.driver_id {
        driver_pool::mark_available(&mut tx, driver_id, now).await?;
    }

    let event = record_event(
        &mut tx,
        appointment_id,
        status,
        AppointmentStatus::TransportCompleted,
        now,
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Transport completed for appointment {}, driver returned to queue",
        appointment_id
    );
    Ok((updated.into_core()?, event))
}

/// Driver self-reports availability (shift start, manual reset).
pub async fn mark_driver_available(
    pool: &DbPool,
    driver_id: Uuid,
) -> CoordResult<DriverAvailabilityEntry> {
    let entry = driver_pool::mark_available_pool(pool, driver_id, Utc::now()).await?;
    Ok(entry.into_core())
}

/// Auto-cancellation sweep: every appointment still awaiting a response
/// past its deadline is cancelled exactly once. Locked rows are skipped
/// (an in-flight transition owns them) and re-swept on the next pass;
/// re-running after cancellation is a no-op.
pub async fn sweep_expired(pool: &DbPool, now: DateTime<Utc>) -> CoordResult<Vec<StatusChange>> {
    let mut tx = pool.begin().await.map_err(db_err)?;

    let expired = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE status IN ('pending', 'awaiting_confirmation')
          AND respond_by <= $1
        FOR UPDATE SKIP LOCKED
        "#
    ))
    .bind(now)
    .fetch_all(&mut *tx)
    .await
    .map_err(db_err)?;

    let mut events = Vec::with_capacity(expired.len());
    for row in expired {
        let from = row.status()?;
        sqlx::query(
            r#"
            UPDATE appointments
            SET status = 'auto_cancelled', auto_cancelled_at = $2
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let event = record_event(
            &mut tx,
            row.id,
            from,
            AppointmentStatus::AutoCancelled,
            now,
        )
        .await?;
        events.push(event);
    }

    tx.commit().await.map_err(db_err)?;
    if !events.is_empty() {
        tracing::info!("Auto-cancelled {} expired appointment(s)", events.len());
    }
    Ok(events)
}

/* ------------------------------------------------------------------ */

async fn step_transport(
    pool: &DbPool,
    appointment_id: Uuid,
    actor: Actor,
    from: AppointmentStatus,
    to: AppointmentStatus,
    action: &str,
) -> CoordResult<(Appointment, StatusChange)> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let row = load_locked(&mut tx, appointment_id).await?;
    let status = row.status()?;
    let appointment = row.into_core()?;

    lifecycle::authorize(&actor, &appointment)?;
    lifecycle::guard(status, &[from], action)?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let event = record_event(&mut tx, appointment_id, status, to, now).await?;

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Appointment {} transport step {} -> {}",
        appointment_id,
        status,
        to
    );
    Ok((updated.into_core()?, event))
}

async fn load_locked(conn: &mut PgConnection, appointment_id: Uuid) -> CoordResult<DbAppointment> {
    crate::repositories::appointment::lock_appointment(conn, appointment_id)
        .await?
        .ok_or_else(|| CoordError::NotFound(format!("appointment {appointment_id}")))
}

async fn set_status(
    conn: &mut PgConnection,
    appointment_id: Uuid,
    to: AppointmentStatus,
) -> CoordResult<Option<DbAppointment>> {
    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $2
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment_id)
    .bind(to.as_str())
    .fetch_one(conn)
    .await
    .map_err(db_err)?;

    Ok(Some(updated))
}

async fn record_event(
    conn: &mut PgConnection,
    appointment_id: Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus,
    at: DateTime<Utc>,
) -> CoordResult<StatusChange> {
    sqlx::query(
        r#"
        INSERT INTO status_events (id, appointment_id, from_status, to_status, occurred_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(appointment_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(at)
    .execute(conn)
    .await
    .map_err(db_err)?;

    Ok(StatusChange {
        appointment_id,
        from,
        to,
        occurred_at: at,
    })
}
