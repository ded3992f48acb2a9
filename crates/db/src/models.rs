use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use caresync_core::models::appointment::{Appointment, AppointmentStatus, PickupUrgency};
use caresync_core::models::driver::DriverAvailabilityEntry;
use caresync_core::models::event::StatusChange;
use caresync_core::models::material::{MaterialStock, MaterialUsageRecord, UsageType};
use caresync_core::models::party::{ConfirmationRecord, RequiredParty};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub provider_ids: Vec<Uuid>,
    pub driver_id: Option<Uuid>,
    pub group_size: i32,
    pub requires_car: bool,
    pub status: String,
    pub respond_by: DateTime<Utc>,
    pub pickup_urgency: Option<String>,
    pub pickup_notes: Option<String>,
    pub rejected_by_role: Option<String>,
    pub rejected_by_id: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub provider_accepted_at: Option<DateTime<Utc>>,
    pub driver_accepted_at: Option<DateTime<Utc>>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub session_ended_at: Option<DateTime<Utc>>,
    pub pickup_requested_at: Option<DateTime<Utc>>,
    pub pickup_confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub auto_cancelled_at: Option<DateTime<Utc>>,
    pub transport_completed_at: Option<DateTime<Utc>>,
}

impl DbAppointment {
    pub fn status(&self) -> eyre::Result<AppointmentStatus> {
        AppointmentStatus::from_str(&self.status).map_err(|e| eyre::eyre!(e))
    }

    pub fn into_core(self) -> eyre::Result<Appointment> {
        let status = AppointmentStatus::from_str(&self.status).map_err(|e| eyre::eyre!(e))?;
        let pickup_urgency = self
            .pickup_urgency
            .as_deref()
            .map(PickupUrgency::from_str)
            .transpose()
            .map_err(|e| eyre::eyre!(e))?;
        let rejected_by = match (self.rejected_by_role.as_deref(), self.rejected_by_id) {
            (Some("provider"), Some(id)) => Some(RequiredParty::Provider(id)),
            (Some("driver"), Some(id)) => Some(RequiredParty::Driver(id)),
            _ => None,
        };

        Ok(Appointment {
            id: self.id,
            client_id: self.client_id,
            scheduled_date: self.scheduled_date,
            start_time: self.start_time,
            end_time: self.end_time,
            location: self.location,
            provider_ids: self.provider_ids,
            driver_id: self.driver_id,
            group_size: self.group_size,
            requires_car: self.requires_car,
            status,
            respond_by: self.respond_by,
            pickup_urgency,
            pickup_notes: self.pickup_notes,
            rejected_by,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            provider_accepted_at: self.provider_accepted_at,
            driver_accepted_at: self.driver_accepted_at,
            session_started_at: self.session_started_at,
            session_ended_at: self.session_ended_at,
            pickup_requested_at: self.pickup_requested_at,
            pickup_confirmed_at: self.pickup_confirmed_at,
            rejected_at: self.rejected_at,
            auto_cancelled_at: self.auto_cancelled_at,
            transport_completed_at: self.transport_completed_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbConfirmation {
    pub appointment_id: Uuid,
    pub party_role: String,
    pub party_id: Uuid,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DbConfirmation {
    pub fn into_core(self) -> eyre::Result<ConfirmationRecord> {
        let party = match self.party_role.as_str() {
            "provider" => RequiredParty::Provider(self.party_id),
            "driver" => RequiredParty::Driver(self.party_id),
            other => return Err(eyre::eyre!("unknown party role: {other}")),
        };
        Ok(ConfirmationRecord {
            appointment_id: self.appointment_id,
            party,
            confirmed_at: self.confirmed_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbDriverAvailability {
    pub driver_id: Uuid,
    pub last_available_at: Option<DateTime<Utc>>,
}

impl DbDriverAvailability {
    pub fn into_core(self) -> DriverAvailabilityEntry {
        DriverAvailabilityEntry {
            driver_id: self.driver_id,
            last_available_at: self.last_available_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbMaterial {
    pub id: Uuid,
    pub name: String,
    pub usage_type: String,
    pub available: i32,
    pub in_use: i32,
}

impl DbMaterial {
    pub fn into_core(self) -> eyre::Result<MaterialStock> {
        let usage_type = UsageType::from_str(&self.usage_type).map_err(|e| eyre::eyre!(e))?;
        Ok(MaterialStock {
            material_id: self.id,
            name: self.name,
            usage_type,
            available: self.available,
            in_use: self.in_use,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbMaterialUsage {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub material_id: Uuid,
    pub quantity: i32,
    pub usage_type: String,
    pub deducted_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl DbMaterialUsage {
    pub fn into_core(self) -> eyre::Result<MaterialUsageRecord> {
        let usage_type = UsageType::from_str(&self.usage_type).map_err(|e| eyre::eyre!(e))?;
        Ok(MaterialUsageRecord {
            appointment_id: self.appointment_id,
            material_id: self.material_id,
            quantity: self.quantity,
            usage_type,
            deducted_at: self.deducted_at,
            returned_at: self.returned_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbStatusEvent {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub occurred_at: DateTime<Utc>,
}

impl DbStatusEvent {
    pub fn into_core(self) -> eyre::Result<StatusChange> {
        Ok(StatusChange {
            appointment_id: self.appointment_id,
            from: AppointmentStatus::from_str(&self.from_status).map_err(|e| eyre::eyre!(e))?,
            to: AppointmentStatus::from_str(&self.to_status).map_err(|e| eyre::eyre!(e))?,
            occurred_at: self.occurred_at,
        })
    }
}
