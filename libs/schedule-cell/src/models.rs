// libs/schedule-cell/src/models.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::DatabaseError;

// ==============================================================================
// SCHEDULE TEMPLATE MODELS
// ==============================================================================

/// One recurring weekly availability window of a doctor.
///
/// `day_of_week` uses ISO-8601 numbering: 1 = Monday through 7 = Sunday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleBlock {
    pub fn new(
        doctor_id: Uuid,
        day_of_week: i32,
        start_time: NaiveTime,
        end_time: NaiveTime,
        slot_duration_minutes: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            day_of_week,
            start_time,
            end_time,
            slot_duration_minutes,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the per-block invariants. Cross-block rules live in `ScheduleService`.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(1..=7).contains(&self.day_of_week) {
            return Err(ScheduleError::ValidationError(format!(
                "day_of_week must be between 1 (Monday) and 7 (Sunday), got {}",
                self.day_of_week
            )));
        }
        if [self.start_time, self.end_time]
            .iter()
            .any(|t| t.second() != 0 || t.nanosecond() != 0)
        {
            return Err(ScheduleError::ValidationError(
                "start_time and end_time must fall on whole minutes".to_string(),
            ));
        }
        if self.slot_duration_minutes <= 0 {
            return Err(ScheduleError::ValidationError(
                "slot_duration_minutes must be greater than zero".to_string(),
            ));
        }
        if self.start_time >= self.end_time {
            return Err(ScheduleError::ValidationError(
                "start_time must be before end_time".to_string(),
            ));
        }
        let window_minutes = minutes_of_day(self.end_time) - minutes_of_day(self.start_time);
        if window_minutes < self.slot_duration_minutes as i64 {
            return Err(ScheduleError::ValidationError(format!(
                "window {}-{} is shorter than one {}-minute slot",
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M"),
                self.slot_duration_minutes
            )));
        }
        Ok(())
    }

    pub fn overlaps(&self, other: &ScheduleBlock) -> bool {
        self.doctor_id == other.doctor_id
            && self.day_of_week == other.day_of_week
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleBlockRequest {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScheduleBlockRequest {
    pub day_of_week: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub slot_duration_minutes: Option<i32>,
    pub is_available: Option<bool>,
}

impl UpdateScheduleBlockRequest {
    pub fn apply_to(&self, block: &mut ScheduleBlock) {
        if let Some(day_of_week) = self.day_of_week {
            block.day_of_week = day_of_week;
        }
        if let Some(start_time) = self.start_time {
            block.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            block.end_time = end_time;
        }
        if let Some(minutes) = self.slot_duration_minutes {
            block.slot_duration_minutes = minutes;
        }
        if let Some(is_available) = self.is_available {
            block.is_available = is_available;
        }
        block.updated_at = Utc::now();
    }
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

/// A generated `[start_time, end_time)` window on some date. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Window used for a weekday on which the doctor has no enabled block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
}

impl SlotWindow {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            start_time: config.default_slot_window_start,
            end_time: config.default_slot_window_end,
            slot_duration_minutes: config.default_slot_minutes,
        }
    }
}

impl Default for SlotWindow {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

/// ISO weekday number (1 = Monday … 7 = Sunday) of a calendar date.
pub fn day_of_week_for(date: NaiveDate) -> i32 {
    date.weekday().number_from_monday() as i32
}

pub(crate) fn minutes_of_day(time: NaiveTime) -> i64 {
    (time.num_seconds_from_midnight() / 60) as i64
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Schedule block not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Schedule block overlaps block {existing_id} ({existing_window})")]
    Overlap {
        existing_id: Uuid,
        existing_window: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DatabaseError> for ScheduleError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(_) => ScheduleError::NotFound,
            other => ScheduleError::DatabaseError(other.to_string()),
        }
    }
}
