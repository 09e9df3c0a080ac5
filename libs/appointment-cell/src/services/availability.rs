// libs/appointment-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};
use uuid::Uuid;

use schedule_cell::{CandidateSlot, SlotGenerator};
use shared_utils::clock::Clock;

use crate::models::{Appointment, AppointmentError, DayAvailability, SlotAvailability};
use crate::store::AppointmentStore;

/// Marks a doctor's candidate slots as booked or elapsed.
///
/// Always reads bookings straight from the store, so the answer reflects every
/// committed write.
pub struct AvailabilityResolver {
    slots: Arc<SlotGenerator>,
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityResolver {
    pub fn new(
        slots: Arc<SlotGenerator>,
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { slots, store, clock }
    }

    pub async fn resolve(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<SlotAvailability>, AppointmentError> {
        let candidates = self.slots.generate(doctor_id, date).await?;
        let booked = self.store.list_active_for_day(doctor_id, date).await?;

        let resolved = resolve_slots(&candidates, &booked, exclude_appointment_id, date, self.clock.now());
        debug!(
            "Resolved {} slots for doctor {} on {} ({} active bookings)",
            resolved.len(),
            doctor_id,
            date,
            booked.len()
        );
        Ok(resolved)
    }

    pub async fn day_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<DayAvailability, AppointmentError> {
        let slots = self.resolve(doctor_id, date, None).await?;
        Ok(DayAvailability {
            doctor_id,
            date,
            slots,
        })
    }

    /// `Ok` only when `schedule_date_time` starts a generated slot that has not
    /// elapsed and is not held by another active appointment.
    pub async fn ensure_bookable(
        &self,
        doctor_id: Uuid,
        schedule_date_time: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let slots = self
            .resolve(doctor_id, schedule_date_time.date(), exclude_appointment_id)
            .await?;
        let requested = schedule_date_time.time();

        let reason = match slots.iter().find(|slot| slot.start_time == requested) {
            None => "no slot starts at the requested time",
            Some(slot) if !slot.is_available => "the requested slot has already elapsed",
            Some(slot) if slot.is_booked => "the requested slot is already booked",
            Some(_) => return Ok(()),
        };

        warn!("Doctor {} slot {} refused: {}", doctor_id, schedule_date_time, reason);
        Err(AppointmentError::SlotUnavailable(format!(
            "{} ({})",
            reason, schedule_date_time
        )))
    }
}

/// Pure slot resolution against a set of active bookings and the current time.
pub fn resolve_slots(
    candidates: &[CandidateSlot],
    booked: &[Appointment],
    exclude_appointment_id: Option<Uuid>,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Vec<SlotAvailability> {
    let taken: HashSet<NaiveTime> = booked
        .iter()
        .filter(|a| a.is_active() && a.date() == date)
        .filter(|a| Some(a.id) != exclude_appointment_id)
        .map(|a| a.time_of_day())
        .collect();

    let today = now.date();

    candidates
        .iter()
        .map(|candidate| {
            let elapsed = date < today || (date == today && candidate.start_time < now.time());
            SlotAvailability {
                start_time: candidate.start_time,
                end_time: candidate.end_time,
                is_available: !elapsed,
                is_booked: taken.contains(&candidate.start_time),
            }
        })
        .collect()
}
