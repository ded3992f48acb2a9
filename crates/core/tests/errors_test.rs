use std::error::Error;
use uuid::Uuid;

use caresync_core::errors::{CoordError, CoordResult};
use caresync_core::models::appointment::AppointmentStatus;

#[test]
fn test_coord_error_display() {
    let invalid = CoordError::InvalidTransition {
        from: AppointmentStatus::Rejected,
        action: "start".to_string(),
    };
    let forbidden = CoordError::Forbidden("not your appointment".to_string());
    let unknown = CoordError::UnknownParty("never required".to_string());
    let window = CoordError::WindowClosed("too late to confirm".to_string());
    let no_driver = CoordError::NoDriverAvailable;
    let not_found = CoordError::NotFound("appointment x".to_string());
    let validation = CoordError::Validation("group_size must be at least 1".to_string());

    assert_eq!(
        invalid.to_string(),
        "Invalid transition: start is not legal from rejected"
    );
    assert_eq!(forbidden.to_string(), "Forbidden: not your appointment");
    assert_eq!(unknown.to_string(), "Unknown party: never required");
    assert_eq!(
        window.to_string(),
        "Confirmation window closed: too late to confirm"
    );
    assert_eq!(no_driver.to_string(), "No driver currently available");
    assert_eq!(not_found.to_string(), "Resource not found: appointment x");
    assert_eq!(
        validation.to_string(),
        "Validation error: group_size must be at least 1"
    );
}

#[test]
fn test_insufficient_stock_names_the_shortfall() {
    let material_id = Uuid::new_v4();
    let err = CoordError::InsufficientStock {
        material_id,
        requested: 5,
        available: 2,
    };

    let message = err.to_string();
    assert!(message.contains(&material_id.to_string()));
    assert!(message.contains("requested 5"));
    assert!(message.contains("available 2"));
}

#[test]
fn test_only_no_driver_available_is_retryable() {
    assert!(CoordError::NoDriverAvailable.is_retryable());
    assert!(!CoordError::Forbidden("nope".to_string()).is_retryable());
    assert!(!CoordError::WindowClosed("late".to_string()).is_retryable());
    assert!(
        !CoordError::InvalidTransition {
            from: AppointmentStatus::Pending,
            action: "complete".to_string(),
        }
        .is_retryable()
    );
}

#[test]
fn test_database_error_conversion() {
    let eyre_error = eyre::eyre!("connection refused");
    let err = CoordError::Database(eyre_error);

    assert!(err.to_string().contains("Database error"));
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_internal_error_keeps_its_source() {
    let io_error = std::io::Error::other("broken pipe");
    let boxed: Box<dyn Error + Send + Sync> = Box::new(io_error);
    let err = CoordError::Internal(boxed);

    assert!(err.source().is_some());
    assert!(err.to_string().contains("broken pipe"));
}

#[test]
fn test_coord_result() {
    let ok: CoordResult<i32> = Ok(7);
    assert_eq!(ok.unwrap(), 7);

    let err: CoordResult<i32> = Err(CoordError::NoDriverAvailable);
    assert!(err.is_err());
}
