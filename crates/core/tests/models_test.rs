use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{from_str, json, to_string};
use std::str::FromStr;
use uuid::Uuid;

use caresync_core::models::appointment::{
    Appointment, AppointmentStatus, ConfirmRequest, CreateAppointmentRequest, PickupUrgency,
    RequestPickupRequest, TransitionResponse,
};
use caresync_core::models::event::StatusChange;
use caresync_core::models::material::{MaterialUsageRecord, UsageType};
use caresync_core::models::party::{Actor, ConfirmationRecord, RequiredParty};

#[rstest]
#[case(AppointmentStatus::Pending, "pending")]
#[case(AppointmentStatus::AwaitingConfirmation, "awaiting_confirmation")]
#[case(AppointmentStatus::Confirmed, "confirmed")]
#[case(AppointmentStatus::DriverAssigned, "driver_assigned")]
#[case(AppointmentStatus::Ready, "ready")]
#[case(AppointmentStatus::InProgress, "in_progress")]
#[case(AppointmentStatus::PickupRequested, "pickup_requested")]
#[case(AppointmentStatus::DrivingToLocation, "driving_to_location")]
#[case(AppointmentStatus::AtLocation, "at_location")]
#[case(AppointmentStatus::ProviderPickedUp, "provider_picked_up")]
#[case(AppointmentStatus::TransportCompleted, "transport_completed")]
#[case(AppointmentStatus::Completed, "completed")]
#[case(AppointmentStatus::Rejected, "rejected")]
#[case(AppointmentStatus::AutoCancelled, "auto_cancelled")]
fn test_status_wire_format(#[case] status: AppointmentStatus, #[case] wire: &str) {
    assert_eq!(status.as_str(), wire);
    assert_eq!(AppointmentStatus::from_str(wire).unwrap(), status);

    let json = to_string(&status).expect("Failed to serialize status");
    assert_eq!(json, format!("\"{wire}\""));
}

#[test]
fn test_unknown_status_is_rejected() {
    assert!(AppointmentStatus::from_str("seated").is_err());
}

#[test]
fn test_appointment_serialization() {
    let now = Utc::now();
    let appointment = Appointment {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        scheduled_date: now.date_naive(),
        start_time: now + Duration::hours(2),
        end_time: now + Duration::hours(3),
        location: "22 Garden Lane".to_string(),
        provider_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        driver_id: Some(Uuid::new_v4()),
        group_size: 2,
        requires_car: true,
        status: AppointmentStatus::DriverAssigned,
        respond_by: now + Duration::hours(1),
        pickup_urgency: None,
        pickup_notes: None,
        rejected_by: None,
        rejection_reason: None,
        created_at: now,
        provider_accepted_at: Some(now),
        driver_accepted_at: None,
        session_started_at: None,
        session_ended_at: None,
        pickup_requested_at: None,
        pickup_confirmed_at: None,
        rejected_at: None,
        auto_cancelled_at: None,
        transport_completed_at: None,
    };

    let json = to_string(&appointment).expect("Failed to serialize appointment");
    let deserialized: Appointment = from_str(&json).expect("Failed to deserialize appointment");

    assert_eq!(deserialized.id, appointment.id);
    assert_eq!(deserialized.provider_ids, appointment.provider_ids);
    assert_eq!(deserialized.driver_id, appointment.driver_id);
    assert_eq!(deserialized.status, appointment.status);
    assert_eq!(deserialized.respond_by, appointment.respond_by);
}

#[test]
fn test_required_party_tagged_representation() {
    let id = Uuid::new_v4();
    let provider = RequiredParty::Provider(id);

    let value = serde_json::to_value(provider).expect("Failed to serialize party");
    assert_eq!(value, json!({ "role": "provider", "id": id }));

    let driver: RequiredParty =
        serde_json::from_value(json!({ "role": "driver", "id": id })).unwrap();
    assert_eq!(driver, RequiredParty::Driver(id));
    assert!(driver.is_driver());
    assert_eq!(driver.party_id(), id);
}

#[test]
fn test_actor_coordinator_has_no_id() {
    let json = to_string(&Actor::Coordinator).expect("Failed to serialize actor");
    let deserialized: Actor = from_str(&json).expect("Failed to deserialize actor");
    assert_eq!(deserialized, Actor::Coordinator);
}

#[test]
fn test_confirmation_record_roundtrip() {
    let record = ConfirmationRecord {
        appointment_id: Uuid::new_v4(),
        party: RequiredParty::Provider(Uuid::new_v4()),
        confirmed_at: None,
        created_at: Utc::now(),
    };

    assert!(!record.is_confirmed());

    let json = to_string(&record).expect("Failed to serialize confirmation record");
    let deserialized: ConfirmationRecord =
        from_str(&json).expect("Failed to deserialize confirmation record");

    assert_eq!(deserialized.appointment_id, record.appointment_id);
    assert_eq!(deserialized.party, record.party);
    assert_eq!(deserialized.confirmed_at, record.confirmed_at);
}

#[rstest]
#[case(UsageType::Consumable, "consumable")]
#[case(UsageType::Reusable, "reusable")]
fn test_usage_type_wire_format(#[case] usage_type: UsageType, #[case] wire: &str) {
    assert_eq!(usage_type.as_str(), wire);
    assert_eq!(UsageType::from_str(wire).unwrap(), usage_type);
}

#[test]
fn test_only_unreturned_reusable_usage_is_outstanding() {
    let now = Utc::now();
    let mut usage = MaterialUsageRecord {
        appointment_id: Uuid::new_v4(),
        material_id: Uuid::new_v4(),
        quantity: 2,
        usage_type: UsageType::Reusable,
        deducted_at: now,
        returned_at: None,
    };
    assert!(usage.is_outstanding());

    usage.returned_at = Some(now);
    assert!(!usage.is_outstanding());

    usage.returned_at = None;
    usage.usage_type = UsageType::Consumable;
    assert!(!usage.is_outstanding());
}

#[rstest]
#[case(PickupUrgency::Normal, "normal")]
#[case(PickupUrgency::Urgent, "urgent")]
fn test_pickup_urgency_wire_format(#[case] urgency: PickupUrgency, #[case] wire: &str) {
    assert_eq!(urgency.as_str(), wire);
    assert_eq!(PickupUrgency::from_str(wire).unwrap(), urgency);
}

#[test]
fn test_create_appointment_request_roundtrip() {
    let now = Utc::now();
    let request = CreateAppointmentRequest {
        client_id: Uuid::new_v4(),
        scheduled_date: now.date_naive(),
        start_time: now + Duration::hours(48),
        end_time: now + Duration::hours(49),
        location: "7 Meadow Court".to_string(),
        provider_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        group_size: 2,
        requires_car: true,
        respond_by: now + Duration::hours(24),
    };

    let json = to_string(&request).expect("Failed to serialize create appointment request");
    let deserialized: CreateAppointmentRequest =
        from_str(&json).expect("Failed to deserialize create appointment request");

    assert_eq!(deserialized.client_id, request.client_id);
    assert_eq!(deserialized.provider_ids.len(), request.provider_ids.len());
    assert_eq!(deserialized.group_size, request.group_size);
    assert_eq!(deserialized.requires_car, request.requires_car);
}

#[test]
fn test_confirm_request_accepts_provider_party() {
    let id = Uuid::new_v4();
    let request: ConfirmRequest = serde_json::from_value(json!({
        "party": { "role": "provider", "id": id }
    }))
    .expect("Failed to deserialize confirm request");

    assert_eq!(request.party, Actor::Provider(id));
}

#[test]
fn test_request_pickup_request_roundtrip() {
    let request = RequestPickupRequest {
        party: Actor::Provider(Uuid::new_v4()),
        urgency: PickupUrgency::Urgent,
        notes: Some("second-floor entrance".to_string()),
    };

    let json = to_string(&request).expect("Failed to serialize pickup request");
    let deserialized: RequestPickupRequest =
        from_str(&json).expect("Failed to deserialize pickup request");

    assert_eq!(deserialized.party, request.party);
    assert_eq!(deserialized.urgency, request.urgency);
    assert_eq!(deserialized.notes, request.notes);
}

#[test]
fn test_transition_response_with_event() {
    let now = Utc::now();
    let appointment_id = Uuid::new_v4();
    let response = TransitionResponse {
        appointment_id,
        status: AppointmentStatus::Ready,
        event: Some(StatusChange {
            appointment_id,
            from: AppointmentStatus::AwaitingConfirmation,
            to: AppointmentStatus::Ready,
            occurred_at: now,
        }),
    };

    let json = to_string(&response).expect("Failed to serialize transition response");
    let deserialized: TransitionResponse =
        from_str(&json).expect("Failed to deserialize transition response");

    assert_eq!(deserialized.appointment_id, response.appointment_id);
    assert_eq!(deserialized.status, AppointmentStatus::Ready);
    let event = deserialized.event.expect("event should survive the roundtrip");
    assert_eq!(event.from, AppointmentStatus::AwaitingConfirmation);
    assert_eq!(event.to, AppointmentStatus::Ready);
}
