// libs/appointment-cell/src/services/rescheduling.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use shared_utils::actor::{Action, Actor};

use crate::models::{Appointment, AppointmentError};
use crate::services::availability::AvailabilityResolver;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locks::BookingLocks;
use crate::store::AppointmentStore;

/// Moves existing appointments to another slot of the same doctor.
pub struct ReschedulingService {
    store: Arc<dyn AppointmentStore>,
    availability: Arc<AvailabilityResolver>,
    locks: Arc<BookingLocks>,
    lifecycle: AppointmentLifecycleService,
}

impl ReschedulingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        availability: Arc<AvailabilityResolver>,
        locks: Arc<BookingLocks>,
    ) -> Self {
        Self {
            store,
            availability,
            locks,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Moves an appointment to `new_date`, keeping its time of day.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_date: NaiveDate,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.locks.acquire_for(self.store.as_ref(), appointment_id).await?;
        let current = self.load_movable(appointment_id, actor).await?;

        if new_date == current.date() {
            info!("Appointment {} already on {}, nothing to move", appointment_id, new_date);
            return Ok(current);
        }

        let target = new_date.and_time(current.time_of_day());
        let moved = Appointment {
            schedule_date_time: target,
            ..current.clone()
        };
        self.commit_move(&current, moved).await
    }

    /// Moves an appointment to a full date and time.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn reschedule_to(
        &self,
        appointment_id: Uuid,
        new_date_time: NaiveDateTime,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.locks.acquire_for(self.store.as_ref(), appointment_id).await?;
        let current = self.load_movable(appointment_id, actor).await?;

        if new_date_time == current.schedule_date_time {
            return Ok(current);
        }

        let moved = Appointment {
            schedule_date_time: new_date_time,
            ..current.clone()
        };
        self.commit_move(&current, moved).await
    }

    async fn load_movable(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        let current = self
            .store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        self.lifecycle.check_mutation(&current, Action::Reschedule, actor)?;
        ensure_not_cancelled(&current)?;
        Ok(current)
    }

    /// Writes `moved` in place of `current` if its slot is bookable.
    ///
    /// The caller holds the doctor's booking lock and read `current` under it.
    /// The availability check excludes the appointment itself.
    pub(crate) async fn commit_move(
        &self,
        current: &Appointment,
        mut moved: Appointment,
    ) -> Result<Appointment, AppointmentError> {
        ensure_not_cancelled(current)?;

        self.availability
            .ensure_bookable(current.doctor_id, moved.schedule_date_time, Some(current.id))
            .await?;

        moved.updated_at = Utc::now();
        let saved = self.store.move_if_slot_free(moved).await?;

        info!(
            "Appointment {} moved from {} to {}",
            saved.id, current.schedule_date_time, saved.schedule_date_time
        );
        Ok(saved)
    }
}

fn ensure_not_cancelled(appointment: &Appointment) -> Result<(), AppointmentError> {
    if appointment.is_active() {
        Ok(())
    } else {
        Err(AppointmentError::invalid_state(
            Action::Reschedule,
            "cancelled appointments cannot be moved",
        ))
    }
}
