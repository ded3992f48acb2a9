use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

use caresync_core::errors::CoordError;
use caresync_core::lifecycle::{
    authorize, confirmation_window_open, confirmed_provider_count, confirming_party, fifo_head,
    fifo_order, guard, is_fully_confirmed, position_of, providers_fully_confirmed,
    should_auto_cancel, status_after_provider_confirmation, valid_transitions,
    validate_new_booking, validate_transition,
};
use caresync_core::models::appointment::{Appointment, AppointmentStatus};
use caresync_core::models::driver::DriverAvailabilityEntry;
use caresync_core::models::party::{Actor, ConfirmationRecord, RequiredParty};

fn appointment(group_size: i32, requires_car: bool) -> Appointment {
    let now = Utc::now();
    let provider_ids = (0..group_size).map(|_| Uuid::new_v4()).collect();

    Appointment {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        scheduled_date: now.date_naive(),
        start_time: now + Duration::hours(24),
        end_time: now + Duration::hours(25),
        location: "14 Hillcrest Road".to_string(),
        provider_ids,
        driver_id: None,
        group_size,
        requires_car,
        status: AppointmentStatus::Pending,
        respond_by: now + Duration::hours(12),
        pickup_urgency: None,
        pickup_notes: None,
        rejected_by: None,
        rejection_reason: None,
        created_at: now,
        provider_accepted_at: None,
        driver_accepted_at: None,
        session_started_at: None,
        session_ended_at: None,
        pickup_requested_at: None,
        pickup_confirmed_at: None,
        rejected_at: None,
        auto_cancelled_at: None,
        transport_completed_at: None,
    }
}

fn record(appointment_id: Uuid, party: RequiredParty, confirmed: bool) -> ConfirmationRecord {
    let now = Utc::now();
    ConfirmationRecord {
        appointment_id,
        party,
        confirmed_at: confirmed.then_some(now),
        created_at: now,
    }
}

#[rstest]
#[case(AppointmentStatus::Completed)]
#[case(AppointmentStatus::Rejected)]
#[case(AppointmentStatus::AutoCancelled)]
fn test_terminal_statuses_have_no_transitions(#[case] status: AppointmentStatus) {
    assert!(status.is_terminal());
    assert_eq!(valid_transitions(status), vec![]);
}

#[rstest]
#[case(AppointmentStatus::Pending, AppointmentStatus::AwaitingConfirmation)]
#[case(AppointmentStatus::AwaitingConfirmation, AppointmentStatus::Confirmed)]
#[case(AppointmentStatus::AwaitingConfirmation, AppointmentStatus::Ready)]
#[case(AppointmentStatus::Confirmed, AppointmentStatus::DriverAssigned)]
#[case(AppointmentStatus::DriverAssigned, AppointmentStatus::Ready)]
#[case(AppointmentStatus::Ready, AppointmentStatus::InProgress)]
#[case(AppointmentStatus::InProgress, AppointmentStatus::Completed)]
#[case(AppointmentStatus::InProgress, AppointmentStatus::PickupRequested)]
#[case(AppointmentStatus::PickupRequested, AppointmentStatus::DrivingToLocation)]
#[case(AppointmentStatus::DrivingToLocation, AppointmentStatus::AtLocation)]
#[case(AppointmentStatus::AtLocation, AppointmentStatus::ProviderPickedUp)]
#[case(AppointmentStatus::ProviderPickedUp, AppointmentStatus::TransportCompleted)]
#[case(AppointmentStatus::TransportCompleted, AppointmentStatus::Completed)]
fn test_legal_transitions(#[case] from: AppointmentStatus, #[case] to: AppointmentStatus) {
    assert!(validate_transition(from, to, "test").is_ok());
}

#[rstest]
#[case(AppointmentStatus::Pending, AppointmentStatus::Confirmed)]
#[case(AppointmentStatus::Pending, AppointmentStatus::InProgress)]
#[case(AppointmentStatus::Confirmed, AppointmentStatus::InProgress)]
#[case(AppointmentStatus::Ready, AppointmentStatus::Completed)]
#[case(AppointmentStatus::Completed, AppointmentStatus::InProgress)]
#[case(AppointmentStatus::Rejected, AppointmentStatus::Pending)]
#[case(AppointmentStatus::AutoCancelled, AppointmentStatus::AwaitingConfirmation)]
#[case(AppointmentStatus::TransportCompleted, AppointmentStatus::InProgress)]
fn test_illegal_transitions(#[case] from: AppointmentStatus, #[case] to: AppointmentStatus) {
    let result = validate_transition(from, to, "test");
    assert!(matches!(
        result,
        Err(CoordError::InvalidTransition { from: f, .. }) if f == from
    ));
}

#[test]
fn test_rejection_is_reachable_from_every_non_terminal_status() {
    use AppointmentStatus::*;
    for status in [
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
    ] {
        assert!(
            valid_transitions(status).contains(&Rejected),
            "reject must be legal from {status}"
        );
    }
}

#[test]
fn test_guard_rejects_start_after_rejection() {
    let result = guard(
        AppointmentStatus::Rejected,
        &[AppointmentStatus::Ready],
        "start",
    );
    assert!(matches!(
        result,
        Err(CoordError::InvalidTransition { from: AppointmentStatus::Rejected, ref action }) if action == "start"
    ));
}

#[test]
fn test_single_provider_no_car_is_fully_confirmed_alone() {
    let appt = appointment(1, false);
    let records = vec![record(
        appt.id,
        RequiredParty::Provider(appt.provider_ids[0]),
        true,
    )];

    assert!(providers_fully_confirmed(&records, 1));
    assert!(is_fully_confirmed(&records, 1, false, None));
}

#[rstest]
#[case(&[0, 1])]
#[case(&[1, 0])]
fn test_group_of_two_requires_both_in_any_order(#[case] order: &[usize]) {
    let appt = appointment(2, true);
    let mut records: Vec<ConfirmationRecord> = appt
        .provider_ids
        .iter()
        .map(|id| record(appt.id, RequiredParty::Provider(*id), false))
        .collect();

    assert!(!providers_fully_confirmed(&records, 2));

    records[order[0]].confirmed_at = Some(Utc::now());
    assert!(
        !providers_fully_confirmed(&records, 2),
        "one of two confirmations must not satisfy the group threshold"
    );

    records[order[1]].confirmed_at = Some(Utc::now());
    assert!(providers_fully_confirmed(&records, 2));
}

#[test]
fn test_group_of_three_confirms_exactly_on_the_last() {
    let appt = appointment(3, true);
    let mut records: Vec<ConfirmationRecord> = appt
        .provider_ids
        .iter()
        .map(|id| record(appt.id, RequiredParty::Provider(*id), false))
        .collect();

    for i in 0..3 {
        assert!(!providers_fully_confirmed(&records, 3));
        records[i].confirmed_at = Some(Utc::now());
    }
    assert!(providers_fully_confirmed(&records, 3));
    assert_eq!(confirmed_provider_count(&records), 3);
}

#[test]
fn test_driver_confirmation_gates_full_confirmation_once_assigned() {
    let appt = appointment(2, true);
    let driver = Uuid::new_v4();
    let mut records: Vec<ConfirmationRecord> = appt
        .provider_ids
        .iter()
        .map(|id| record(appt.id, RequiredParty::Provider(*id), true))
        .collect();

    // Providers alone suffice while no driver exists yet.
    assert!(is_fully_confirmed(&records, 2, true, None));

    // Once assigned, the driver's pending record blocks.
    records.push(record(appt.id, RequiredParty::Driver(driver), false));
    assert!(!is_fully_confirmed(&records, 2, true, Some(driver)));

    records.last_mut().unwrap().confirmed_at = Some(Utc::now());
    assert!(is_fully_confirmed(&records, 2, true, Some(driver)));
}

#[test]
fn test_confirmed_step_collapses_to_ready_without_car() {
    assert_eq!(
        status_after_provider_confirmation(false),
        AppointmentStatus::Ready
    );
    assert_eq!(
        status_after_provider_confirmation(true),
        AppointmentStatus::Confirmed
    );
}

#[test]
fn test_fifo_order_earliest_available_wins() {
    let t1 = Utc::now();
    let t2 = t1 + Duration::minutes(5);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let entries = vec![
        DriverAvailabilityEntry {
            driver_id: b,
            last_available_at: Some(t2),
        },
        DriverAvailabilityEntry {
            driver_id: a,
            last_available_at: Some(t1),
        },
    ];

    assert_eq!(fifo_order(&entries), vec![a, b]);
    assert_eq!(fifo_head(&entries), Some(a));
    assert_eq!(position_of(&entries, a), Some(1));
    assert_eq!(position_of(&entries, b), Some(2));
}

#[test]
fn test_remarking_availability_resets_queue_position() {
    let t1 = Utc::now();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    // a was first, then re-marked after b became available.
    let entries = vec![
        DriverAvailabilityEntry {
            driver_id: a,
            last_available_at: Some(t1 + Duration::minutes(10)),
        },
        DriverAvailabilityEntry {
            driver_id: b,
            last_available_at: Some(t1 + Duration::minutes(2)),
        },
    ];

    assert_eq!(fifo_head(&entries), Some(b));
    assert_eq!(position_of(&entries, a), Some(2));
}

#[test]
fn test_assigned_drivers_are_not_queue_candidates() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let entries = vec![
        DriverAvailabilityEntry {
            driver_id: a,
            last_available_at: None,
        },
        DriverAvailabilityEntry {
            driver_id: b,
            last_available_at: Some(Utc::now()),
        },
    ];

    assert_eq!(fifo_order(&entries), vec![b]);
    assert_eq!(position_of(&entries, a), None);
}

#[test]
fn test_empty_queue_has_no_head() {
    assert_eq!(fifo_head(&[]), None);
}

#[test]
fn test_authorize_accepts_assigned_parties_and_coordinator() {
    let mut appt = appointment(2, true);
    let driver = Uuid::new_v4();
    appt.driver_id = Some(driver);

    assert!(authorize(&Actor::Coordinator, &appt).is_ok());
    assert!(authorize(&Actor::Provider(appt.provider_ids[0]), &appt).is_ok());
    assert!(authorize(&Actor::Driver(driver), &appt).is_ok());
}

#[test]
fn test_authorize_rejects_unrelated_parties() {
    let appt = appointment(1, false);

    let stranger = authorize(&Actor::Provider(Uuid::new_v4()), &appt);
    assert!(matches!(stranger, Err(CoordError::Forbidden(_))));

    let not_my_driver = authorize(&Actor::Driver(Uuid::new_v4()), &appt);
    assert!(matches!(not_my_driver, Err(CoordError::Forbidden(_))));
}

#[test]
fn test_coordinator_cannot_confirm_anonymously() {
    let appt = appointment(1, false);
    let result = confirming_party(&Actor::Coordinator, &appt);
    assert!(matches!(result, Err(CoordError::Validation(_))));
}

#[test]
fn test_unassigned_driver_is_an_unknown_party() {
    let appt = appointment(1, true);
    let result = confirming_party(&Actor::Driver(Uuid::new_v4()), &appt);
    assert!(matches!(result, Err(CoordError::UnknownParty(_))));
}

#[test]
fn test_confirmation_window() {
    let deadline = Utc::now();
    assert!(confirmation_window_open(
        deadline - Duration::seconds(1),
        deadline
    ));
    // Landing exactly on the deadline is already too late.
    assert!(!confirmation_window_open(deadline, deadline));
    assert!(!confirmation_window_open(
        deadline + Duration::seconds(1),
        deadline
    ));
}

#[rstest]
#[case(AppointmentStatus::Pending, true)]
#[case(AppointmentStatus::AwaitingConfirmation, true)]
#[case(AppointmentStatus::Confirmed, false)]
#[case(AppointmentStatus::InProgress, false)]
#[case(AppointmentStatus::AutoCancelled, false)]
fn test_should_auto_cancel_only_while_awaiting_response(
    #[case] status: AppointmentStatus,
    #[case] expected: bool,
) {
    let mut appt = appointment(1, false);
    appt.status = status;
    let past_deadline = appt.respond_by + Duration::minutes(1);

    assert_eq!(should_auto_cancel(&appt, past_deadline), expected);
}

#[test]
fn test_sweep_is_a_no_op_before_the_deadline() {
    let appt = appointment(1, false);
    let before = appt.respond_by - Duration::minutes(1);
    assert!(!should_auto_cancel(&appt, before));
}

#[rstest]
#[case(1, false, 1, true)]
#[case(1, true, 1, true)]
#[case(2, true, 2, true)]
#[case(0, false, 0, false)]
#[case(2, false, 2, false)]
#[case(2, true, 1, false)]
fn test_validate_new_booking(
    #[case] group_size: i32,
    #[case] requires_car: bool,
    #[case] provider_count: usize,
    #[case] ok: bool,
) {
    let result = validate_new_booking(group_size, requires_car, provider_count);
    assert_eq!(result.is_ok(), ok);
}
