use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::appointment::AppointmentStatus;

/// Emitted on every successful transition and persisted alongside it.
/// The notification dispatcher consumes these; delivery is external.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub appointment_id: Uuid,
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub occurred_at: DateTime<Utc>,
}
