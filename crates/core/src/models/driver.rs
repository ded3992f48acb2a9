use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry per driver. A null `last_available_at` means the driver is
/// currently assigned and not a candidate for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAvailabilityEntry {
    pub driver_id: Uuid,
    pub last_available_at: Option<DateTime<Utc>>,
}

impl DriverAvailabilityEntry {
    pub fn is_available(&self) -> bool {
        self.last_available_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePositionResponse {
    pub driver_id: Uuid,
    pub position: Option<usize>,
}
