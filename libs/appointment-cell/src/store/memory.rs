use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};
use crate::store::AppointmentStore;

/// Process-local appointment store. Every conditional write runs under one write lock.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_taken(
        appointments: &HashMap<Uuid, Appointment>,
        candidate: &Appointment,
    ) -> bool {
        appointments.values().any(|existing| {
            existing.id != candidate.id
                && existing.occupies(candidate.doctor_id, candidate.schedule_date_time)
        })
    }
}

fn slot_taken_error(appointment: &Appointment) -> AppointmentError {
    AppointmentError::SlotUnavailable(format!(
        "doctor {} is already booked at {}",
        appointment.doctor_id, appointment.schedule_date_time
    ))
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn list_active_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        let mut matches: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.date() == date && a.is_active())
            .cloned()
            .collect();
        matches.sort_by_key(|a| a.schedule_date_time);
        Ok(matches)
    }

    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        let mut matches: Vec<Appointment> = appointments
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        matches.sort_by_key(|a| (a.schedule_date_time, a.created_at));
        Ok(matches)
    }

    async fn insert_if_slot_free(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        if appointment.is_active() && Self::slot_taken(&appointments, &appointment) {
            return Err(slot_taken_error(&appointment));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn move_if_slot_free(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::NotFound);
        }
        if appointment.is_active() && Self::slot_taken(&appointments, &appointment) {
            return Err(slot_taken_error(&appointment));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let stored = appointments
            .get_mut(&appointment.id)
            .ok_or(AppointmentError::NotFound)?;
        *stored = Appointment {
            doctor_id: stored.doctor_id,
            schedule_date_time: stored.schedule_date_time,
            ..appointment
        };
        Ok(stored.clone())
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.appointments
            .write()
            .await
            .remove(&appointment_id)
            .map(|_| ())
            .ok_or(AppointmentError::NotFound)
    }
}
