// libs/schedule-cell/src/services/slots.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use crate::models::{day_of_week_for, minutes_of_day, CandidateSlot, ScheduleBlock, ScheduleError, SlotWindow};
use crate::services::schedule::ScheduleService;

/// Turns a doctor's weekly template into the candidate slots of one date.
pub struct SlotGenerator {
    schedules: Arc<ScheduleService>,
    fallback: SlotWindow,
}

impl SlotGenerator {
    pub fn new(schedules: Arc<ScheduleService>, fallback: SlotWindow) -> Self {
        Self { schedules, fallback }
    }

    pub async fn generate(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<CandidateSlot>, ScheduleError> {
        let day_of_week = day_of_week_for(date);
        let blocks: Vec<ScheduleBlock> = self
            .schedules
            .blocks_for_day(doctor_id, day_of_week)
            .await?
            .into_iter()
            .filter(|block| block.is_available)
            .collect();

        let slots = if blocks.is_empty() {
            debug!(
                "Doctor {} has no enabled blocks on day {}, using default window",
                doctor_id, day_of_week
            );
            slots_for_window(
                self.fallback.start_time,
                self.fallback.end_time,
                self.fallback.slot_duration_minutes,
            )
        } else {
            generate_slots(&blocks)
        };

        debug!("Generated {} candidate slots for doctor {} on {}", slots.len(), doctor_id, date);
        Ok(slots)
    }
}

/// Slots of every block, ordered by start time. Identical starts are emitted
/// once, keeping the shortest slot, whatever the order of `blocks`.
pub fn generate_slots(blocks: &[ScheduleBlock]) -> Vec<CandidateSlot> {
    let mut slots: Vec<CandidateSlot> = blocks
        .iter()
        .flat_map(|block| slots_for_window(block.start_time, block.end_time, block.slot_duration_minutes))
        .collect();

    slots.sort_by_key(|slot| (slot.start_time, slot.end_time));
    slots.dedup_by_key(|slot| slot.start_time);
    slots
}

/// Walks `[start, end)` in steps of `slot_minutes`, dropping a short trailing remainder.
pub fn slots_for_window(start: NaiveTime, end: NaiveTime, slot_minutes: i32) -> Vec<CandidateSlot> {
    if slot_minutes <= 0 {
        return Vec::new();
    }

    let step = slot_minutes as i64;
    let end_minutes = minutes_of_day(end);
    let mut current = minutes_of_day(start);
    let mut slots = Vec::new();

    while current + step <= end_minutes {
        if let (Some(slot_start), Some(slot_end)) = (time_at(current), time_at(current + step)) {
            slots.push(CandidateSlot {
                start_time: slot_start,
                end_time: slot_end,
            });
        }
        current += step;
    }

    slots
}

fn time_at(minutes: i64) -> Option<NaiveTime> {
    NaiveTime::from_num_seconds_from_midnight_opt((minutes * 60) as u32, 0)
}
