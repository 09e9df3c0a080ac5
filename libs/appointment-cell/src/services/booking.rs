// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_utils::actor::{Action, Actor};

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    CreateAppointmentRequest, PaymentStatus, UpdateAppointmentRequest,
};
use crate::services::availability::AvailabilityResolver;
use crate::services::directory::{DoctorDirectory, PatientDirectory};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locks::BookingLocks;
use crate::services::rescheduling::ReschedulingService;
use crate::store::AppointmentStore;

/// Creates appointments and applies edits, cancellations and deletions.
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    availability: Arc<AvailabilityResolver>,
    locks: Arc<BookingLocks>,
    rescheduling: Arc<ReschedulingService>,
    patients: Arc<dyn PatientDirectory>,
    doctors: Arc<dyn DoctorDirectory>,
    lifecycle: AppointmentLifecycleService,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        availability: Arc<AvailabilityResolver>,
        locks: Arc<BookingLocks>,
        rescheduling: Arc<ReschedulingService>,
        patients: Arc<dyn PatientDirectory>,
        doctors: Arc<dyn DoctorDirectory>,
    ) -> Self {
        Self {
            store,
            availability,
            locks,
            rescheduling,
            patients,
            doctors,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Books a slot. Exactly one of any number of concurrent requests for the
    /// same doctor and start time succeeds; the rest get `SlotUnavailable`.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, at = %request.schedule_date_time))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        request.validate()?;

        if !self.patients.patient_exists(request.patient_id).await? {
            return Err(AppointmentError::ValidationError(format!(
                "unknown patient {}",
                request.patient_id
            )));
        }

        let doctor = self
            .doctors
            .get_doctor(request.doctor_id)
            .await?
            .ok_or_else(|| AppointmentError::ValidationError(format!("unknown doctor {}", request.doctor_id)))?;

        if !doctor.is_available {
            return Err(AppointmentError::ValidationError(format!(
                "doctor {} is not accepting appointments",
                request.doctor_id
            )));
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            schedule_date_time: request.schedule_date_time,
            appointment_type: request.appointment_type,
            status: request.status.unwrap_or(AppointmentStatus::Pending),
            payment_status: request.payment_status.unwrap_or_default(),
            payment_amount: request
                .payment_amount
                .unwrap_or_else(|| doctor.fee_for(request.appointment_type)),
            payment_method: request.payment_method,
            reason: request.reason.trim().to_string(),
            note: request.note,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        let _guard = self.locks.acquire(appointment.doctor_id).await;

        self.availability
            .ensure_bookable(appointment.doctor_id, appointment.schedule_date_time, None)
            .await?;

        let created = self.store.insert_if_slot_free(appointment).await?;

        info!(
            "Appointment {} booked for patient {} with doctor {} at {}",
            created.id, created.patient_id, created.doctor_id, created.schedule_date_time
        );
        Ok(created)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments with {:?}", query);
        self.store.search(query).await
    }

    /// Applies a partial edit under the doctor's booking lock. A new
    /// `schedule_date_time` goes through the same slot check as rescheduling,
    /// committed together with the other fields.
    #[instrument(skip(self, request, actor), fields(actor = %actor.user_id))]
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        request.validate()?;

        let _guard = self.locks.acquire_for(self.store.as_ref(), appointment_id).await?;
        let current = self.get_appointment(appointment_id).await?;
        self.lifecycle.check_mutation(&current, Action::Edit, actor)?;

        let mut updated = current.clone();

        if let Some(status) = request.status {
            self.lifecycle.validate_status_transition(current.status, status)?;
            updated.status = status;
        }
        if let Some(payment_status) = request.payment_status {
            self.lifecycle
                .validate_payment_transition(current.payment_status, payment_status)?;
            updated.payment_status = payment_status;
        }
        if let Some(appointment_type) = request.appointment_type {
            updated.appointment_type = appointment_type;
        }
        if let Some(amount) = request.payment_amount {
            updated.payment_amount = amount;
        }
        if let Some(method) = request.payment_method {
            updated.payment_method = Some(method);
        }
        if let Some(reason) = request.reason {
            updated.reason = reason.trim().to_string();
        }
        if let Some(note) = request.note {
            updated.note = Some(note);
        }

        let moving = request
            .schedule_date_time
            .filter(|target| *target != current.schedule_date_time);

        if let Some(target) = moving {
            self.lifecycle.check_mutation(&current, Action::Reschedule, actor)?;
            updated.schedule_date_time = target;
            return self.rescheduling.commit_move(&current, updated).await;
        }

        if updated == current {
            debug!("Update of appointment {} changes nothing", appointment_id);
            return Ok(current);
        }

        updated.updated_at = Utc::now();
        let saved = self.store.update(updated).await?;
        info!("Appointment {} updated by {}", appointment_id, actor.user_id);
        Ok(saved)
    }

    /// Cancels an active appointment, freeing its slot at once.
    ///
    /// Cancelling an already cancelled appointment succeeds without change for
    /// privileged actors.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.locks.acquire_for(self.store.as_ref(), appointment_id).await?;
        let current = self.get_appointment(appointment_id).await?;
        self.lifecycle.check_mutation(&current, Action::Cancel, actor)?;

        if current.status == AppointmentStatus::Cancelled {
            debug!("Appointment {} already cancelled", appointment_id);
            return Ok(current);
        }

        self.lifecycle
            .validate_status_transition(current.status, AppointmentStatus::Cancelled)?;

        let mut cancelled = current;
        cancelled.status = AppointmentStatus::Cancelled;
        cancelled.cancellation_reason = reason.filter(|r| !r.trim().is_empty());
        cancelled.updated_at = Utc::now();

        let saved = self.store.update(cancelled).await?;
        info!("Appointment {} cancelled by {}", appointment_id, actor.user_id);
        Ok(saved)
    }

    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn delete_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<(), AppointmentError> {
        let _guard = self.locks.acquire_for(self.store.as_ref(), appointment_id).await?;
        let current = self.get_appointment(appointment_id).await?;
        self.lifecycle.check_mutation(&current, Action::Delete, actor)?;

        if current.payment_status == PaymentStatus::Paid {
            warn!("Deleting paid appointment {} at request of {}", appointment_id, actor.user_id);
        }

        self.store.delete(appointment_id).await?;
        info!("Appointment {} deleted by {}", appointment_id, actor.user_id);
        Ok(())
    }

    pub fn check_mutation(
        &self,
        appointment: &Appointment,
        action: Action,
        actor: &Actor,
    ) -> Result<(), AppointmentError> {
        self.lifecycle.check_mutation(appointment, action, actor)
    }
}
