use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::models::DbDriverAvailability;

/// Set or refresh a driver's availability. A driver already in the
/// queue has its position reset to the new timestamp, so a later
/// availability always sorts after an earlier one.
pub async fn mark_available(
    conn: &mut PgConnection,
    driver_id: Uuid,
    at: DateTime<Utc>,
) -> Result<DbDriverAvailability> {
    tracing::debug!("Marking driver available: driver={}, at={}", driver_id, at);

    let entry = sqlx::query_as::<_, DbDriverAvailability>(
        r#"
        INSERT INTO driver_availability (driver_id, last_available_at)
        VALUES ($1, $2)
        ON CONFLICT (driver_id) DO UPDATE SET last_available_at = EXCLUDED.last_available_at
        RETURNING driver_id, last_available_at
        "#,
    )
    .bind(driver_id)
    .bind(at)
    .fetch_one(conn)
    .await?;

    Ok(entry)
}

pub async fn mark_available_pool(
    pool: &Pool<Postgres>,
    driver_id: Uuid,
    at: DateTime<Utc>,
) -> Result<DbDriverAvailability> {
    let mut conn = pool.acquire().await?;
    mark_available(&mut conn, driver_id, at).await
}

/// Pop the head of the FIFO queue: the driver with the earliest
/// `last_available_at`. The row lock and the null-out happen in the
/// caller's transaction, so two concurrent callers can never receive
/// the same driver; a contending caller skips the locked row and sees
/// the next one.
pub async fn assign_next(conn: &mut PgConnection) -> Result<Option<Uuid>> {
    let candidate: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT driver_id
        FROM driver_availability
        WHERE last_available_at IS NOT NULL
        ORDER BY last_available_at ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .fetch_optional(&mut *conn)
    .await?;

    let Some(driver_id) = candidate else {
        tracing::debug!("Driver queue is empty");
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE driver_availability
        SET last_available_at = NULL
        WHERE driver_id = $1
        "#,
    )
    .bind(driver_id)
    .execute(conn)
    .await?;

    tracing::debug!("Assigned driver {} from queue head", driver_id);
    Ok(Some(driver_id))
}

/// 1-based rank within the available set, derived from the persisted
/// timestamps on every call.
pub async fn position_of(pool: &Pool<Postgres>, driver_id: Uuid) -> Result<Option<i64>> {
    let position: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT rank
        FROM (
            SELECT driver_id,
                   ROW_NUMBER() OVER (ORDER BY last_available_at ASC) AS rank
            FROM driver_availability
            WHERE last_available_at IS NOT NULL
        ) ranked
        WHERE driver_id = $1
        "#,
    )
    .bind(driver_id)
    .fetch_optional(pool)
    .await?;

    Ok(position)
}

pub async fn list_available(pool: &Pool<Postgres>) -> Result<Vec<DbDriverAvailability>> {
    let entries = sqlx::query_as::<_, DbDriverAvailability>(
        r#"
        SELECT driver_id, last_available_at
        FROM driver_availability
        WHERE last_available_at IS NOT NULL
        ORDER BY last_available_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
