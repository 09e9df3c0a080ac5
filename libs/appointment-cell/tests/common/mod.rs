#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use appointment_cell::{
    AppointmentStore, AppointmentType, AvailabilityResolver, BookingLocks, BookingService,
    CreateAppointmentRequest, DoctorProfile, InMemoryAppointmentStore, InMemoryDirectory,
    ReschedulingService,
};
use schedule_cell::{CreateScheduleBlockRequest, InMemoryScheduleStore, ScheduleService, SlotGenerator, SlotWindow};
use shared_utils::clock::FixedClock;

/// A fully wired in-memory engine with one registered doctor and patient.
pub struct Engine {
    pub booking: Arc<BookingService>,
    pub rescheduling: Arc<ReschedulingService>,
    pub availability: Arc<AvailabilityResolver>,
    pub schedules: Arc<ScheduleService>,
    pub store: Arc<dyn AppointmentStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_time(time(h, m))
}

/// The clock reads 2024-06-01 08:00, a Saturday.
pub fn default_now() -> NaiveDateTime {
    at(day(2024, 6, 1), 8, 0)
}

pub async fn engine() -> Engine {
    engine_at(default_now()).await
}

pub async fn engine_at(now: NaiveDateTime) -> Engine {
    engine_with_patient(now, Uuid::new_v4()).await
}

pub async fn engine_with_patient(now: NaiveDateTime, patient_id: Uuid) -> Engine {
    engine_with_store(now, patient_id, Arc::new(InMemoryAppointmentStore::new())).await
}

pub async fn engine_with_store(
    now: NaiveDateTime,
    patient_id: Uuid,
    store: Arc<dyn AppointmentStore>,
) -> Engine {
    let schedules = Arc::new(ScheduleService::new(Arc::new(InMemoryScheduleStore::new()), true));
    let slots = Arc::new(SlotGenerator::new(schedules.clone(), SlotWindow::default()));
    let availability = Arc::new(AvailabilityResolver::new(
        slots,
        store.clone(),
        Arc::new(FixedClock(now)),
    ));
    let locks = Arc::new(BookingLocks::new());
    let rescheduling = Arc::new(ReschedulingService::new(
        store.clone(),
        availability.clone(),
        locks.clone(),
    ));

    let directory = Arc::new(InMemoryDirectory::new());
    let doctor_id = Uuid::new_v4();
    directory.add_patient(patient_id).await;
    directory.add_doctor(DoctorProfile::new(doctor_id, 80.0, 40.0)).await;

    let booking = Arc::new(BookingService::new(
        store.clone(),
        availability.clone(),
        locks,
        rescheduling.clone(),
        directory.clone(),
        directory.clone(),
    ));

    Engine {
        booking,
        rescheduling,
        availability,
        schedules,
        store,
        directory,
        doctor_id,
        patient_id,
    }
}

impl Engine {
    pub fn request(&self, schedule_date_time: NaiveDateTime) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            schedule_date_time,
            appointment_type: AppointmentType::Consultation,
            reason: "Annual checkup".to_string(),
            note: None,
            payment_status: None,
            payment_amount: None,
            payment_method: None,
            status: None,
        }
    }

    pub async fn add_block(&self, day_of_week: i32, start: NaiveTime, end: NaiveTime, minutes: i32) {
        self.schedules
            .create_block(
                self.doctor_id,
                CreateScheduleBlockRequest {
                    day_of_week,
                    start_time: start,
                    end_time: end,
                    slot_duration_minutes: minutes,
                    is_available: None,
                },
            )
            .await
            .unwrap();
    }
}
