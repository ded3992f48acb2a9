use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::party::RequiredParty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    AwaitingConfirmation,
    Confirmed,
    DriverAssigned,
    Ready,
    InProgress,
    PickupRequested,
    DrivingToLocation,
    AtLocation,
    ProviderPickedUp,
    TransportCompleted,
    Completed,
    Rejected,
    AutoCancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::AwaitingConfirmation => "awaiting_confirmation",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::DriverAssigned => "driver_assigned",
            AppointmentStatus::Ready => "ready",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::PickupRequested => "pickup_requested",
            AppointmentStatus::DrivingToLocation => "driving_to_location",
            AppointmentStatus::AtLocation => "at_location",
            AppointmentStatus::ProviderPickedUp => "provider_picked_up",
            AppointmentStatus::TransportCompleted => "transport_completed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::AutoCancelled => "auto_cancelled",
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Rejected
                | AppointmentStatus::AutoCancelled
        )
    }

    /// Statuses in which the auto-cancellation deadline still applies.
    pub fn is_awaiting_response(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::AwaitingConfirmation
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "awaiting_confirmation" => Ok(AppointmentStatus::AwaitingConfirmation),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "driver_assigned" => Ok(AppointmentStatus::DriverAssigned),
            "ready" => Ok(AppointmentStatus::Ready),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "pickup_requested" => Ok(AppointmentStatus::PickupRequested),
            "driving_to_location" => Ok(AppointmentStatus::DrivingToLocation),
            "at_location" => Ok(AppointmentStatus::AtLocation),
            "provider_picked_up" => Ok(AppointmentStatus::ProviderPickedUp),
            "transport_completed" => Ok(AppointmentStatus::TransportCompleted),
            "completed" => Ok(AppointmentStatus::Completed),
            "rejected" => Ok(AppointmentStatus::Rejected),
            "auto_cancelled" => Ok(AppointmentStatus::AutoCancelled),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupUrgency {
    Normal,
    Urgent,
}

impl PickupUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupUrgency::Normal => "normal",
            PickupUrgency::Urgent => "urgent",
        }
    }
}

impl FromStr for PickupUrgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(PickupUrgency::Normal),
            "urgent" => Ok(PickupUrgency::Urgent),
            other => Err(format!("unknown pickup urgency: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
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
    pub status: AppointmentStatus,
    pub respond_by: DateTime<Utc>,
    pub pickup_urgency: Option<PickupUrgency>,
    pub pickup_notes: Option<String>,
    pub rejected_by: Option<RequiredParty>,
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

impl Appointment {
    pub fn is_assigned_provider(&self, provider_id: Uuid) -> bool {
        self.provider_ids.contains(&provider_id)
    }

    pub fn is_assigned_driver(&self, driver_id: Uuid) -> bool {
        self.driver_id == Some(driver_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub client_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub provider_ids: Vec<Uuid>,
    pub group_size: i32,
    pub requires_car: bool,
    pub respond_by: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequest {
    pub provider_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub party: crate::models::party::Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub party: crate::models::party::Actor,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub party: crate::models::party::Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub party: crate::models::party::Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPickupRequest {
    pub party: crate::models::party::Actor,
    pub urgency: PickupUrgency,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportStepRequest {
    pub party: crate::models::party::Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetailResponse {
    pub appointment: Appointment,
    pub confirmations: Vec<crate::models::party::ConfirmationRecord>,
    /// Every required party (providers, plus the driver once assigned
    /// on transport bookings) has confirmed.
    pub fully_confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
    pub outcome: crate::models::party::ConfirmOutcome,
    /// Absent when the confirmation did not advance the status.
    pub event: Option<crate::models::event::StatusChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
    /// Absent when the request was an idempotent retry that changed nothing.
    pub event: Option<crate::models::event::StatusChange>,
}
