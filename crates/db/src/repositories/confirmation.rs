use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use caresync_core::models::party::{ConfirmOutcome, RequiredParty};

use crate::models::DbConfirmation;

/// Create a pending confirmation record. Idempotent: re-invocation for
/// the same party is a no-op.
pub async fn require_confirmation(
    conn: &mut PgConnection,
    appointment_id: Uuid,
    party: RequiredParty,
) -> Result<()> {
    tracing::debug!(
        "Requiring confirmation: appointment={}, party={}/{}",
        appointment_id,
        party.role(),
        party.party_id()
    );

    sqlx::query(
        r#"
        INSERT INTO confirmations (appointment_id, party_role, party_id, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (appointment_id, party_role, party_id) DO NOTHING
        "#,
    )
    .bind(appointment_id)
    .bind(party.role())
    .bind(party.party_id())
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Stamp a party's confirmation. Returns None when the party was never
/// required; `AlreadyConfirmed` when the stamp already exists (records
/// are immutable once confirmed).
pub async fn stamp_confirmation(
    conn: &mut PgConnection,
    appointment_id: Uuid,
    party: RequiredParty,
    at: DateTime<Utc>,
) -> Result<Option<ConfirmOutcome>> {
    let existing: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
        r#"
        SELECT confirmed_at
        FROM confirmations
        WHERE appointment_id = $1 AND party_role = $2 AND party_id = $3
        FOR UPDATE
        "#,
    )
    .bind(appointment_id)
    .bind(party.role())
    .bind(party.party_id())
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        None => Ok(None),
        Some(Some(_)) => Ok(Some(ConfirmOutcome::AlreadyConfirmed)),
        Some(None) => {
            sqlx::query(
                r#"
                UPDATE confirmations
                SET confirmed_at = $4
                WHERE appointment_id = $1 AND party_role = $2 AND party_id = $3
                "#,
            )
            .bind(appointment_id)
            .bind(party.role())
            .bind(party.party_id())
            .bind(at)
            .execute(conn)
            .await?;

            Ok(Some(ConfirmOutcome::Confirmed))
        }
    }
}

pub async fn list_for_appointment(
    conn: &mut PgConnection,
    appointment_id: Uuid,
) -> Result<Vec<DbConfirmation>> {
    let records = sqlx::query_as::<_, DbConfirmation>(
        r#"
        SELECT appointment_id, party_role, party_id, confirmed_at, created_at
        FROM confirmations
        WHERE appointment_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(appointment_id)
    .fetch_all(conn)
    .await?;

    Ok(records)
}

pub async fn list_for_appointment_pool(
    pool: &Pool<Postgres>,
    appointment_id: Uuid,
) -> Result<Vec<DbConfirmation>> {
    let mut conn = pool.acquire().await?;
    list_for_appointment(&mut conn, appointment_id).await
}
