// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use schedule_cell::ScheduleError;
use shared_database::DatabaseError;
use shared_utils::actor::Action;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// Clinic-local wall-clock time, no offset.
    pub schedule_date_time: NaiveDateTime,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_amount: f64,
    pub payment_method: Option<String>,
    pub reason: String,
    pub note: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Pending or scheduled appointments hold their slot.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// A paid appointment is presented as scheduled whatever its stored status.
    pub fn display_status(&self) -> AppointmentStatus {
        if self.payment_status == PaymentStatus::Paid {
            AppointmentStatus::Scheduled
        } else {
            self.status
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.schedule_date_time.date()
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.schedule_date_time.time()
    }

    pub fn occupies(&self, doctor_id: Uuid, schedule_date_time: NaiveDateTime) -> bool {
        self.is_active()
            && self.doctor_id == doctor_id
            && self.schedule_date_time == schedule_date_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Scheduled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[serde(alias = "general_consultation")]
    Consultation,

    #[serde(alias = "followup", alias = "follow_up_consultation")]
    FollowUp,

    #[serde(alias = "urgent")]
    Emergency,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
            AppointmentType::Emergency => write!(f, "emergency"),
        }
    }
}

/// An appointment as returned over HTTP, carrying its derived display status.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub display_status: AppointmentStatus,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        let display_status = appointment.display_status();
        Self {
            appointment,
            display_status,
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub schedule_date_time: NaiveDateTime,
    pub appointment_type: AppointmentType,
    pub reason: String,
    pub note: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    /// Defaults to the doctor's fee for the appointment type.
    pub payment_amount: Option<f64>,
    pub payment_method: Option<String>,
    /// Initial status, `pending` when omitted.
    pub status: Option<AppointmentStatus>,
}

impl CreateAppointmentRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.reason.trim().is_empty() {
            return Err(AppointmentError::ValidationError("reason must not be blank".to_string()));
        }
        if let Some(amount) = self.payment_amount {
            validate_amount(amount)?;
        }
        if self.payment_status == Some(PaymentStatus::Refunded) {
            return Err(AppointmentError::ValidationError(
                "a new appointment cannot start out refunded".to_string(),
            ));
        }
        if self.status == Some(AppointmentStatus::Cancelled) {
            return Err(AppointmentError::ValidationError(
                "a new appointment cannot start out cancelled".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub schedule_date_time: Option<NaiveDateTime>,
    pub appointment_type: Option<AppointmentType>,
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub reason: Option<String>,
    pub note: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if let Some(reason) = &self.reason {
            if reason.trim().is_empty() {
                return Err(AppointmentError::ValidationError("reason must not be blank".to_string()));
            }
        }
        if let Some(amount) = self.payment_amount {
            validate_amount(amount)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentSearchQuery {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.date.map_or(true, |date| appointment.date() == date)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

fn validate_amount(amount: f64) -> Result<(), AppointmentError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppointmentError::ValidationError(
            "payment_amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// False once the slot has elapsed.
    pub is_available: bool,
    pub is_booked: bool,
}

impl SlotAvailability {
    pub fn is_bookable(&self) -> bool {
        self.is_available && !self.is_booked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Cannot {action} appointment: {reason}")]
    InvalidState { action: Action, reason: String },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    pub fn invalid_state(action: Action, reason: impl Into<String>) -> Self {
        AppointmentError::InvalidState {
            action,
            reason: reason.into(),
        }
    }
}

impl From<DatabaseError> for AppointmentError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::UniqueViolation(msg) => AppointmentError::SlotUnavailable(msg),
            DatabaseError::NotFound(_) => AppointmentError::NotFound,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppointmentError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(status: AppointmentStatus, payment_status: PaymentStatus) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            schedule_date_time: NaiveDate::from_ymd_opt(2024, 6, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            appointment_type: AppointmentType::Consultation,
            status,
            payment_status,
            payment_amount: 50.0,
            payment_method: None,
            reason: "Checkup".to_string(),
            note: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_paid_displays_as_scheduled() {
        let paid = appointment(AppointmentStatus::Pending, PaymentStatus::Paid);
        assert_eq!(paid.status, AppointmentStatus::Pending);
        assert_eq!(paid.display_status(), AppointmentStatus::Scheduled);

        let unpaid = appointment(AppointmentStatus::Pending, PaymentStatus::Unpaid);
        assert_eq!(unpaid.display_status(), AppointmentStatus::Pending);
    }

    #[test]
    fn test_view_serializes_flat_with_display_status() {
        let view = AppointmentView::from(appointment(AppointmentStatus::Pending, PaymentStatus::Paid));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["display_status"], "scheduled");
        assert_eq!(json["schedule_date_time"], "2024-06-02T09:00:00");
    }

    #[test]
    fn test_create_request_validation() {
        let mut request = CreateAppointmentRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            schedule_date_time: NaiveDate::from_ymd_opt(2024, 6, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            appointment_type: AppointmentType::FollowUp,
            reason: "Review".to_string(),
            note: None,
            payment_status: None,
            payment_amount: None,
            payment_method: None,
            status: None,
        };
        assert!(request.validate().is_ok());

        request.reason = "   ".to_string();
        assert!(request.validate().is_err());

        request.reason = "Review".to_string();
        request.payment_amount = Some(-5.0);
        assert!(request.validate().is_err());

        request.payment_amount = None;
        request.status = Some(AppointmentStatus::Cancelled);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_unique_violation_maps_to_slot_unavailable() {
        let error: AppointmentError = DatabaseError::UniqueViolation("duplicate key".to_string()).into();
        assert!(matches!(error, AppointmentError::SlotUnavailable(_)));
    }
}
