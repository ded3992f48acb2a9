use chrono::{DateTime, Utc};
use mockall::mock;
use uuid::Uuid;

use caresync_core::errors::CoordResult;
use caresync_core::models::appointment::{Appointment, CreateAppointmentRequest, PickupUrgency};
use caresync_core::models::event::StatusChange;
use caresync_core::models::material::DeductionLine;
use caresync_core::models::party::{Actor, ConfirmOutcome, RequiredParty};

use crate::models::{DbAppointment, DbConfirmation, DbDriverAvailability, DbMaterial, DbMaterialUsage};

// Mock repositories for testing
mock! {
    pub AppointmentRepo {
        pub async fn create_appointment(
            &self,
            req: CreateAppointmentRequest,
        ) -> eyre::Result<DbAppointment>;

        pub async fn get_appointment_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbAppointment>>;
    }
}

mock! {
    pub ConfirmationRepo {
        pub async fn require_confirmation(
            &self,
            appointment_id: Uuid,
            party: RequiredParty,
        ) -> eyre::Result<()>;

        pub async fn stamp_confirmation(
            &self,
            appointment_id: Uuid,
            party: RequiredParty,
            at: DateTime<Utc>,
        ) -> eyre::Result<Option<ConfirmOutcome>>;

        pub async fn list_for_appointment(
            &self,
            appointment_id: Uuid,
        ) -> eyre::Result<Vec<DbConfirmation>>;
    }
}

mock! {
    pub DriverPoolRepo {
        pub async fn mark_available(
            &self,
            driver_id: Uuid,
            at: DateTime<Utc>,
        ) -> eyre::Result<DbDriverAvailability>;

        pub async fn assign_next(&self) -> eyre::Result<Option<Uuid>>;

        pub async fn position_of(&self, driver_id: Uuid) -> eyre::Result<Option<i64>>;
    }
}

mock! {
    pub InventoryRepo {
        pub async fn deduct(
            &self,
            appointment_id: Uuid,
            lines: Vec<DeductionLine>,
        ) -> CoordResult<Vec<DbMaterialUsage>>;

        pub async fn return_usage(
            &self,
            appointment_id: Uuid,
            material_id: Uuid,
            quantity: i32,
        ) -> CoordResult<()>;

        pub async fn current_availability(
            &self,
            material_id: Uuid,
        ) -> CoordResult<DbMaterial>;
    }
}

mock! {
    pub LifecycleEngine {
        pub async fn accept_as_provider(
            &self,
            appointment_id: Uuid,
            provider_id: Uuid,
        ) -> CoordResult<(Appointment, StatusChange)>;

        pub async fn confirm_party(
            &self,
            appointment_id: Uuid,
            actor: Actor,
        ) -> CoordResult<(Appointment, Option<StatusChange>, ConfirmOutcome)>;

        pub async fn reject(
            &self,
            appointment_id: Uuid,
            actor: Actor,
            reason: String,
        ) -> CoordResult<(Appointment, StatusChange)>;

        pub async fn start_session(
            &self,
            appointment_id: Uuid,
            actor: Actor,
        ) -> CoordResult<(Appointment, StatusChange)>;

        pub async fn complete(
            &self,
            appointment_id: Uuid,
            actor: Actor,
        ) -> CoordResult<(Appointment, StatusChange)>;

        pub async fn request_pickup(
            &self,
            appointment_id: Uuid,
            actor: Actor,
            urgency: PickupUrgency,
            notes: Option<String>,
        ) -> CoordResult<(Appointment, StatusChange)>;
    }
}
