use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create appointments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            client_id UUID NOT NULL,
            scheduled_date DATE NOT NULL,
            start_time TIMESTAMP WITH TIME ZONE NOT NULL,
            end_time TIMESTAMP WITH TIME ZONE NOT NULL,
            location VARCHAR(255) NOT NULL,
            provider_ids UUID[] NOT NULL,
            driver_id UUID NULL,
            group_size INTEGER NOT NULL DEFAULT 1,
            requires_car BOOLEAN NOT NULL DEFAULT FALSE,
            status VARCHAR(32) NOT NULL DEFAULT 'pending',
            respond_by TIMESTAMP WITH TIME ZONE NOT NULL,
            pickup_urgency VARCHAR(16) NULL,
            pickup_notes TEXT NULL,
            rejected_by_role VARCHAR(16) NULL,
            rejected_by_id UUID NULL,
            rejection_reason TEXT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            provider_accepted_at TIMESTAMP WITH TIME ZONE NULL,
            driver_accepted_at TIMESTAMP WITH TIME ZONE NULL,
            session_started_at TIMESTAMP WITH TIME ZONE NULL,
            session_ended_at TIMESTAMP WITH TIME ZONE NULL,
            pickup_requested_at TIMESTAMP WITH TIME ZONE NULL,
            pickup_confirmed_at TIMESTAMP WITH TIME ZONE NULL,
            rejected_at TIMESTAMP WITH TIME ZONE NULL,
            auto_cancelled_at TIMESTAMP WITH TIME ZONE NULL,
            transport_completed_at TIMESTAMP WITH TIME ZONE NULL,
            CONSTRAINT valid_time_range CHECK (end_time > start_time),
            CONSTRAINT valid_group_size CHECK (group_size >= 1),
            CONSTRAINT group_requires_car CHECK (group_size = 1 OR requires_car)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create confirmations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS confirmations (
            appointment_id UUID NOT NULL REFERENCES appointments(id),
            party_role VARCHAR(16) NOT NULL,
            party_id UUID NOT NULL,
            confirmed_at TIMESTAMP WITH TIME ZONE NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (appointment_id, party_role, party_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create driver_availability table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS driver_availability (
            driver_id UUID PRIMARY KEY,
            last_available_at TIMESTAMP WITH TIME ZONE NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create materials table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS materials (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            usage_type VARCHAR(16) NOT NULL,
            available INTEGER NOT NULL DEFAULT 0,
            in_use INTEGER NOT NULL DEFAULT 0,
            CONSTRAINT non_negative_stock CHECK (available >= 0 AND in_use >= 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create material_usages table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS material_usages (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            appointment_id UUID NOT NULL REFERENCES appointments(id),
            material_id UUID NOT NULL REFERENCES materials(id),
            quantity INTEGER NOT NULL,
            usage_type VARCHAR(16) NOT NULL,
            deducted_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            returned_at TIMESTAMP WITH TIME ZONE NULL,
            CONSTRAINT positive_quantity CHECK (quantity > 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create status_events table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS status_events (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            appointment_id UUID NOT NULL REFERENCES appointments(id),
            from_status VARCHAR(32) NOT NULL,
            to_status VARCHAR(32) NOT NULL,
            occurred_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status);
        CREATE INDEX IF NOT EXISTS idx_appointments_respond_by ON appointments(respond_by);
        CREATE INDEX IF NOT EXISTS idx_confirmations_appointment_id ON confirmations(appointment_id);
        CREATE INDEX IF NOT EXISTS idx_driver_availability_last_available_at ON driver_availability(last_available_at);
        CREATE INDEX IF NOT EXISTS idx_material_usages_appointment_id ON material_usages(appointment_id);
        CREATE INDEX IF NOT EXISTS idx_status_events_appointment_id ON status_events(appointment_id);
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
