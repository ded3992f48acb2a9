use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A party whose confirmation is required before an appointment may
/// proceed. The legacy split between a singular provider field and a
/// separate group collection is folded into this one abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum RequiredParty {
    Provider(Uuid),
    Driver(Uuid),
}

impl RequiredParty {
    pub fn role(&self) -> &'static str {
        match self {
            RequiredParty::Provider(_) => "provider",
            RequiredParty::Driver(_) => "driver",
        }
    }

    pub fn party_id(&self) -> Uuid {
        match self {
            RequiredParty::Provider(id) | RequiredParty::Driver(id) => *id,
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, RequiredParty::Provider(_))
    }

    pub fn is_driver(&self) -> bool {
        matches!(self, RequiredParty::Driver(_))
    }
}

/// The identity an external request acts as. Coordinators act on behalf
/// of any party; providers and drivers only on their own appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Provider(Uuid),
    Driver(Uuid),
    Coordinator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub appointment_id: Uuid,
    pub party: RequiredParty,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConfirmationRecord {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// Result of a confirmation attempt. Re-confirming is a no-op rather
/// than an error so that client retries cannot corrupt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmOutcome {
    Confirmed,
    AlreadyConfirmed,
}
