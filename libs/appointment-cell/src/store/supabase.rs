use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};
use crate::store::AppointmentStore;

const TABLE: &str = "/rest/v1/appointments";
const ACTIVE_FILTER: &str = "status=in.(pending,scheduled)";
// Left out of plain updates; only the conditional move changes the slot.
const KEPT_ON_UPDATE: [&str; 3] = ["id", "doctor_id", "schedule_date_time"];

/// Appointment store backed by the `appointments` PostgREST table.
///
/// Conditional writes rely on the partial unique index over active
/// `(doctor_id, schedule_date_time)` pairs: a clashing write comes back as 409.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, path, None, None).await?;
        Ok(rows)
    }

    async fn write(
        &self,
        method: Method,
        path: &str,
        appointment: &Appointment,
    ) -> Result<Appointment, AppointmentError> {
        let body = to_body(appointment)?;
        self.write_body(method, path, appointment, body).await
    }

    async fn write_body(
        &self,
        method: Method,
        path: &str,
        appointment: &Appointment,
        body: Value,
    ) -> Result<Appointment, AppointmentError> {
        let rows: Vec<Appointment> = self
            .supabase
            .request(method, path, None, Some(body))
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(msg) => {
                    warn!(
                        "Slot {} for doctor {} rejected by unique index",
                        appointment.schedule_date_time, appointment.doctor_id
                    );
                    AppointmentError::SlotUnavailable(msg)
                }
                other => other.into(),
            })?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

fn to_body(appointment: &Appointment) -> Result<Value, AppointmentError> {
    serde_json::to_value(appointment).map_err(|e| AppointmentError::DatabaseError(e.to_string()))
}

fn day_range(date: NaiveDate) -> String {
    let next = date + Duration::days(1);
    format!(
        "schedule_date_time=gte.{}T00:00:00&schedule_date_time=lt.{}T00:00:00",
        date.format("%Y-%m-%d"),
        next.format("%Y-%m-%d")
    )
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE, appointment_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn list_active_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "{}?doctor_id=eq.{}&{}&{}&order=schedule_date_time.asc",
            TABLE,
            doctor_id,
            day_range(date),
            ACTIVE_FILTER
        );
        self.fetch(&path).await
    }

    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let mut filters = Vec::new();
        if let Some(doctor_id) = query.doctor_id {
            filters.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            filters.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(date) = query.date {
            filters.push(day_range(date));
        }
        if let Some(status) = query.status {
            filters.push(format!("status=eq.{}", status));
        }
        filters.push("order=schedule_date_time.asc".to_string());

        let path = format!("{}?{}", TABLE, filters.join("&"));
        debug!("Searching appointments: {}", path);
        self.fetch(&path).await
    }

    async fn insert_if_slot_free(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        self.write(Method::POST, TABLE, &appointment).await
    }

    async fn move_if_slot_free(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE, appointment.id);
        self.write(Method::PATCH, &path, &appointment).await
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE, appointment.id);
        let mut body = to_body(&appointment)?;
        if let Some(fields) = body.as_object_mut() {
            for key in KEPT_ON_UPDATE {
                fields.remove(key);
            }
        }
        self.write_body(Method::PATCH, &path, &appointment, body).await
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE, appointment_id);
        let rows: Vec<Appointment> = self.supabase.request(Method::DELETE, &path, None, None).await?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(())
    }
}
