use thiserror::Error;

use crate::models::appointment::AppointmentStatus;

#[derive(Error, Debug)]
pub enum CoordError {
    #[error("Invalid transition: {action} is not legal from {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: String,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unknown party: {0}")]
    UnknownParty(String),

    #[error("No driver currently available")]
    NoDriverAvailable,

    #[error("Insufficient stock for material {material_id}: requested {requested}, available {available}")]
    InsufficientStock {
        material_id: uuid::Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Invalid return: {0}")]
    InvalidReturn(String),

    #[error("Confirmation window closed: {0}")]
    WindowClosed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CoordError {
    /// Errors the caller is expected to retry rather than treat as fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoordError::NoDriverAvailable)
    }
}

pub type CoordResult<T> = Result<T, CoordError>;
