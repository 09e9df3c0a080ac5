pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

/// Persistence for appointments.
///
/// The two conditional writes are the storage-level half of the no-double-booking
/// guarantee: each must check the `(doctor_id, schedule_date_time)` key and write
/// in one atomic step, failing with `SlotUnavailable` when an active appointment
/// already holds it.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Pending and scheduled appointments of a doctor on one date.
    async fn list_active_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Matches ordered by `schedule_date_time`.
    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError>;

    async fn insert_if_slot_free(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    /// Replaces the stored record with `appointment`, whose slot may differ.
    /// The record being moved never conflicts with itself.
    async fn move_if_slot_free(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    /// Overwrites every field except the slot key (`doctor_id`,
    /// `schedule_date_time`), which only `move_if_slot_free` changes.
    /// `NotFound` if unknown.
    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError>;
}
