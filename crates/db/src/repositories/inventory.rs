use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use caresync_core::errors::{CoordError, CoordResult};
use caresync_core::models::material::{DeductionLine, UsageType};

use crate::models::{DbMaterial, DbMaterialUsage};
use crate::repositories::db_err;

/// Deduct a multi-item request against current stock. All-or-nothing:
/// every line is checked under a row lock inside one transaction, and
/// any shortfall rolls the whole request back with nothing applied.
/// Reusable items move available -> in_use; consumables are consumed.
pub async fn deduct(
    pool: &Pool<Postgres>,
    appointment_id: Uuid,
    lines: &[DeductionLine],
) -> CoordResult<Vec<DbMaterialUsage>> {
    if lines.is_empty() {
        return Err(CoordError::Validation(
            "deduction request must contain at least one line".to_string(),
        ));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(CoordError::Validation(
                "deduction quantity must be positive".to_string(),
            ));
        }
    }

    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();
    let mut usages = Vec::with_capacity(lines.len());

    for line in lines {
        let material = sqlx::query_as::<_, DbMaterial>(
            r#"
            SELECT id, name, usage_type, available, in_use
            FROM materials
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(line.material_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| CoordError::NotFound(format!("material {}", line.material_id)))?;

        if material.available < line.quantity {
            tracing::warn!(
                "Insufficient stock: material={}, requested={}, available={}",
                line.material_id,
                line.quantity,
                material.available
            );
            return Err(CoordError::InsufficientStock {
                material_id: line.material_id,
                requested: line.quantity,
                available: material.available,
            });
        }

        let reusable = material.usage_type == UsageType::Reusable.as_str();
        if reusable {
            sqlx::query(
                r#"
                UPDATE materials
                SET available = available - $2, in_use = in_use + $2
                WHERE id = $1
                "#,
            )
            .bind(line.material_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        } else {
            sqlx::query(
                r#"
                UPDATE materials
                SET available = available - $2
                WHERE id = $1
                "#,
            )
            .bind(line.material_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        let usage = sqlx::query_as::<_, DbMaterialUsage>(
            r#"
            INSERT INTO material_usages (
                id, appointment_id, material_id, quantity, usage_type, deducted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, appointment_id, material_id, quantity, usage_type,
                      deducted_at, returned_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(appointment_id)
        .bind(line.material_id)
        .bind(line.quantity)
        .bind(&material.usage_type)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        usages.push(usage);
    }

    tx.commit().await.map_err(db_err)?;
    tracing::info!(
        "Deducted {} material line(s) for appointment {}",
        usages.len(),
        appointment_id
    );
    Ok(usages)
}

/// Return previously deducted reusable usage for one appointment and
/// material. Returns apply to whole usage records, oldest first; a
/// quantity exceeding the outstanding usage (or landing mid-record)
/// fails with `InvalidReturn` and nothing is applied.
pub async fn return_usage(
    pool: &Pool<Postgres>,
    appointment_id: Uuid,
    material_id: Uuid,
    quantity: i32,
) -> CoordResult<()> {
    if quantity <= 0 {
        return Err(CoordError::Validation(
            "return quantity must be positive".to_string(),
        ));
    }

    let mut tx = pool.begin().await.map_err(db_err)?;
    let now = Utc::now();

    let outstanding = sqlx::query_as::<_, DbMaterialUsage>(
        r#"
        SELECT id, appointment_id, material_id, quantity, usage_type,
               deducted_at, returned_at
        FROM material_usages
        WHERE appointment_id = $1
          AND material_id = $2
          AND usage_type = 'reusable'
          AND returned_at IS NULL
        ORDER BY deducted_at ASC
        FOR UPDATE
        "#,
    )
    .bind(appointment_id)
    .bind(material_id)
    .fetch_all(&mut *tx)
    .await
    .map_err(db_err)?;

    let in_use: i32 = outstanding.iter().map(|u| u.quantity).sum();
    if quantity > in_use {
        return Err(CoordError::InvalidReturn(format!(
            "requested return of {quantity} exceeds {in_use} in use for material {material_id}"
        )));
    }

    let mut remaining = quantity;
    for usage in &outstanding {
        if remaining == 0 {
            break;
        }
        if usage.quantity > remaining {
            return Err(CoordError::InvalidReturn(format!(
                "returns must match deducted quantities; {remaining} left against a record of {}",
                usage.quantity
            )));
        }
        stamp_returned(&mut tx, usage.id, usage.material_id, usage.quantity, now).await?;
        remaining -= usage.quantity;
    }

    tx.commit().await.map_err(db_err)?;
    Ok(())
}

/// Return every outstanding reusable usage for an appointment. Used by
/// the completion transition inside its own transaction; any failure
/// here aborts the whole transition. Consumable records are untouched
/// and never acquire a returned_at. Returns the count of records
/// stamped.
pub async fn return_all_reusable(
    conn: &mut PgConnection,
    appointment_id: Uuid,
    at: DateTime<Utc>,
) -> CoordResult<usize> {
    let outstanding = sqlx::query_as::<_, DbMaterialUsage>(
        r#"
        SELECT id, appointment_id, material_id, quantity, usage_type,
               deducted_at, returned_at
        FROM material_usages
        WHERE appointment_id = $1
          AND usage_type = 'reusable'
          AND returned_at IS NULL
        ORDER BY deducted_at ASC
        FOR UPDATE
        "#,
    )
    .bind(appointment_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    for usage in &outstanding {
        let updated = sqlx::query(
            r#"
            UPDATE materials
            SET in_use = in_use - $2, available = available + $2
            WHERE id = $1 AND in_use >= $2
            "#,
        )
        .bind(usage.material_id)
        .bind(usage.quantity)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            return Err(CoordError::InvalidReturn(format!(
                "in-use count for material {} is below the {} being returned",
                usage.material_id, usage.quantity
            )));
        }

        sqlx::query(
            r#"
            UPDATE material_usages
            SET returned_at = $2
            WHERE id = $1
            "#,
        )
        .bind(usage.id)
        .bind(at)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    }

    Ok(outstanding.len())
}

async fn stamp_returned(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    usage_id: Uuid,
    material_id: Uuid,
    quantity: i32,
    at: DateTime<Utc>,
) -> CoordResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE materials
        SET in_use = in_use - $2, available = available + $2
        WHERE id = $1 AND in_use >= $2
        "#,
    )
    .bind(material_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    if updated.rows_affected() == 0 {
        return Err(CoordError::InvalidReturn(format!(
            "in-use count for material {material_id} is below the {quantity} being returned"
        )));
    }

    sqlx::query(
        r#"
        UPDATE material_usages
        SET returned_at = $2
        WHERE id = $1
        "#,
    )
    .bind(usage_id)
    .bind(at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok(())
}

/// Read-only stock lookup; takes no locks.
pub async fn current_availability(
    pool: &Pool<Postgres>,
    material_id: Uuid,
) -> CoordResult<DbMaterial> {
    let material = sqlx::query_as::<_, DbMaterial>(
        r#"
        SELECT id, name, usage_type, available, in_use
        FROM materials
        WHERE id = $1
        "#,
    )
    .bind(material_id)
    .fetch_optional(pool)
    .await
    .map_err(db_err)?
    .ok_or_else(|| CoordError::NotFound(format!("material {material_id}")))?;

    Ok(material)
}

pub async fn list_usages_for_appointment(
    pool: &Pool<Postgres>,
    appointment_id: Uuid,
) -> CoordResult<Vec<DbMaterialUsage>> {
    let usages = sqlx::query_as::<_, DbMaterialUsage>(
        r#"
        SELECT id, appointment_id, material_id, quantity, usage_type,
               deducted_at, returned_at
        FROM material_usages
        WHERE appointment_id = $1
        ORDER BY deducted_at ASC
        "#,
    )
    .bind(appointment_id)
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    Ok(usages)
}
