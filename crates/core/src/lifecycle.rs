//! Pure appointment lifecycle rules: the status transition table, the
//! multi-party confirmation threshold, FIFO queue ordering, and the
//! permission policy. Everything here is side-effect free; the
//! transactional engine in the db crate executes these decisions.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::errors::{CoordError, CoordResult};
use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::models::driver::DriverAvailabilityEntry;
use crate::models::party::{Actor, ConfirmationRecord, RequiredParty};

/// All statuses a given status may legally transition to.
pub fn valid_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
    use AppointmentStatus::*;

    match current {
        Pending => vec![AwaitingConfirmation, Rejected, AutoCancelled],
        // Ready is reachable directly when the booking needs no car:
        // the confirmed step collapses into it within one transition.
        AwaitingConfirmation => vec![Confirmed, Ready, Rejected, AutoCancelled],
        Confirmed => vec![DriverAssigned, Ready, Rejected],
        DriverAssigned => vec![Ready, Rejected],
        Ready => vec![InProgress, Rejected],
        InProgress => vec![Completed, PickupRequested, Rejected],
        PickupRequested => vec![DrivingToLocation, Rejected],
        DrivingToLocation => vec![AtLocation, Rejected],
        AtLocation => vec![ProviderPickedUp, Rejected],
        ProviderPickedUp => vec![TransportCompleted, Rejected],
        TransportCompleted => vec![Completed, Rejected],
        Completed | Rejected | AutoCancelled => vec![],
    }
}

/// Validate a single edge of the transition graph.
pub fn validate_transition(
    current: AppointmentStatus,
    next: AppointmentStatus,
    action: &str,
) -> CoordResult<()> {
    if valid_transitions(current).contains(&next) {
        Ok(())
    } else {
        warn!(
            from = %current,
            to = %next,
            action,
            "invalid status transition attempted"
        );
        Err(CoordError::InvalidTransition {
            from: current,
            action: action.to_string(),
        })
    }
}

/// Guard an action against the statuses it is legal from.
pub fn guard(
    current: AppointmentStatus,
    allowed: &[AppointmentStatus],
    action: &str,
) -> CoordResult<()> {
    if allowed.contains(&current) {
        Ok(())
    } else {
        warn!(from = %current, action, "action not legal from current status");
        Err(CoordError::InvalidTransition {
            from: current,
            action: action.to_string(),
        })
    }
}

/// Count of distinct providers with a stamped confirmation.
pub fn confirmed_provider_count(records: &[ConfirmationRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.party.is_provider() && r.is_confirmed())
        .count()
}

/// True once every one of the `group_size` providers has confirmed. A
/// single confirmed provider is never sufficient for group bookings.
pub fn providers_fully_confirmed(records: &[ConfirmationRecord], group_size: i32) -> bool {
    confirmed_provider_count(records) >= group_size.max(1) as usize
}

/// True iff every required party has confirmed: all `group_size`
/// providers, plus the assigned driver when the booking requires a car.
/// Driver confirmation only becomes a requirement once a driver exists.
pub fn is_fully_confirmed(
    records: &[ConfirmationRecord],
    group_size: i32,
    requires_car: bool,
    driver_id: Option<Uuid>,
) -> bool {
    if !providers_fully_confirmed(records, group_size) {
        return false;
    }
    if requires_car {
        if let Some(driver) = driver_id {
            return records
                .iter()
                .any(|r| r.party == RequiredParty::Driver(driver) && r.is_confirmed());
        }
    }
    true
}

/// The status reached once all providers have confirmed. Bookings that
/// need no car skip `confirmed`/`driver_assigned` and land on `ready`
/// directly, without a driver confirmation record ever existing.
pub fn status_after_provider_confirmation(requires_car: bool) -> AppointmentStatus {
    if requires_car {
        AppointmentStatus::Confirmed
    } else {
        AppointmentStatus::Ready
    }
}

/// Permission policy: confirm/reject/complete and the transport actions
/// are only valid for an assigned provider, the assigned driver, or a
/// coordinator. Everyone else is rejected regardless of status.
pub fn authorize(actor: &Actor, appointment: &Appointment) -> CoordResult<()> {
    match actor {
        Actor::Coordinator => Ok(()),
        Actor::Provider(id) if appointment.is_assigned_provider(*id) => Ok(()),
        Actor::Driver(id) if appointment.is_assigned_driver(*id) => Ok(()),
        Actor::Provider(id) => Err(CoordError::Forbidden(format!(
            "provider {id} is not assigned to appointment {}",
            appointment.id
        ))),
        Actor::Driver(id) => Err(CoordError::Forbidden(format!(
            "driver {id} is not assigned to appointment {}",
            appointment.id
        ))),
    }
}

/// The required party an actor confirms as, resolved against the
/// appointment's assignments.
pub fn confirming_party(actor: &Actor, appointment: &Appointment) -> CoordResult<RequiredParty> {
    match actor {
        Actor::Provider(id) if appointment.is_assigned_provider(*id) => {
            Ok(RequiredParty::Provider(*id))
        }
        Actor::Driver(id) if appointment.is_assigned_driver(*id) => Ok(RequiredParty::Driver(*id)),
        Actor::Coordinator => Err(CoordError::Validation(
            "coordinator must confirm on behalf of a specific party".to_string(),
        )),
        _ => Err(CoordError::UnknownParty(format!(
            "party is not required on appointment {}",
            appointment.id
        ))),
    }
}

/// Booking-shape invariants enforced at creation time.
pub fn validate_new_booking(
    group_size: i32,
    requires_car: bool,
    provider_count: usize,
) -> CoordResult<()> {
    if group_size < 1 {
        return Err(CoordError::Validation(
            "group_size must be at least 1".to_string(),
        ));
    }
    if provider_count != group_size as usize {
        return Err(CoordError::Validation(format!(
            "expected {group_size} assigned providers, got {provider_count}"
        )));
    }
    if group_size > 1 && !requires_car {
        return Err(CoordError::Validation(
            "group bookings require transport".to_string(),
        ));
    }
    Ok(())
}

/// A confirmation landing strictly before the deadline always wins; one
/// landing after must be rejected even if the sweep has not yet run.
pub fn confirmation_window_open(now: DateTime<Utc>, respond_by: DateTime<Utc>) -> bool {
    now < respond_by
}

/// Whether the sweep should auto-cancel the appointment now.
pub fn should_auto_cancel(appointment: &Appointment, now: DateTime<Utc>) -> bool {
    appointment.status.is_awaiting_response() && now >= appointment.respond_by
}

/// Available drivers in dispatch order: strictly ascending by the time
/// they last became available. No secondary criteria.
pub fn fifo_order(entries: &[DriverAvailabilityEntry]) -> Vec<Uuid> {
    let mut available: Vec<(DateTime<Utc>, Uuid)> = entries
        .iter()
        .filter_map(|e| e.last_available_at.map(|at| (at, e.driver_id)))
        .collect();
    available.sort_by_key(|(at, _)| *at);
    available.into_iter().map(|(_, id)| id).collect()
}

/// The driver the next `assign_next` call would receive.
pub fn fifo_head(entries: &[DriverAvailabilityEntry]) -> Option<Uuid> {
    fifo_order(entries).into_iter().next()
}

/// 1-based rank within the available set, or None when the driver is
/// not currently available. Always derived from the timestamps, never
/// cached.
pub fn position_of(entries: &[DriverAvailabilityEntry], driver_id: Uuid) -> Option<usize> {
    fifo_order(entries)
        .iter()
        .position(|id| *id == driver_id)
        .map(|idx| idx + 1)
}
