use std::sync::Arc;

use tracing::{info, warn};

use appointment_cell::{
    AppointmentCellState, AppointmentStore, AvailabilityResolver, BookingLocks, BookingService,
    DoctorDirectory, InMemoryAppointmentStore, InMemoryDirectory, PatientDirectory,
    ReschedulingService, SupabaseAppointmentStore, SupabaseDirectory,
};
use schedule_cell::{
    InMemoryScheduleStore, ScheduleCellState, ScheduleService, ScheduleStore, SlotGenerator,
    SlotWindow, SupabaseScheduleStore,
};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_utils::actor::{PermissionChecker, RolePermissionChecker};
use shared_utils::clock::SystemClock;

pub struct Services {
    pub schedules: Arc<ScheduleCellState>,
    pub appointments: Arc<AppointmentCellState>,
}

struct Backends {
    schedule_store: Arc<dyn ScheduleStore>,
    appointment_store: Arc<dyn AppointmentStore>,
    patients: Arc<dyn PatientDirectory>,
    doctors: Arc<dyn DoctorDirectory>,
}

fn backends(config: &AppConfig) -> Backends {
    let backend = match config.storage_backend {
        StorageBackend::Supabase if !config.is_supabase_configured() => {
            warn!("Supabase backend requested but SUPABASE_URL or key missing, using memory");
            StorageBackend::Memory
        }
        other => other,
    };

    match backend {
        StorageBackend::Supabase => {
            info!("Using Supabase storage at {}", config.supabase_url);
            let client = Arc::new(SupabaseClient::new(config));
            let directory = Arc::new(SupabaseDirectory::with_client(client.clone()));
            Backends {
                schedule_store: Arc::new(SupabaseScheduleStore::with_client(client.clone())),
                appointment_store: Arc::new(SupabaseAppointmentStore::with_client(client)),
                patients: directory.clone(),
                doctors: directory,
            }
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            let directory = Arc::new(InMemoryDirectory::permissive());
            Backends {
                schedule_store: Arc::new(InMemoryScheduleStore::new()),
                appointment_store: Arc::new(InMemoryAppointmentStore::new()),
                patients: directory.clone(),
                doctors: directory,
            }
        }
    }
}

pub fn build_services(config: AppConfig) -> Services {
    let config = Arc::new(config);
    let backends = backends(&config);
    let permissions: Arc<dyn PermissionChecker> = Arc::new(RolePermissionChecker);

    let schedules = Arc::new(ScheduleService::new(
        backends.schedule_store,
        config.reject_overlapping_blocks,
    ));
    let slots = Arc::new(SlotGenerator::new(schedules.clone(), SlotWindow::from_config(&config)));

    let availability = Arc::new(AvailabilityResolver::new(
        slots.clone(),
        backends.appointment_store.clone(),
        Arc::new(SystemClock),
    ));
    let locks = Arc::new(BookingLocks::new());
    let rescheduling = Arc::new(ReschedulingService::new(
        backends.appointment_store.clone(),
        availability.clone(),
        locks.clone(),
    ));
    let booking = Arc::new(BookingService::new(
        backends.appointment_store,
        availability.clone(),
        locks,
        rescheduling.clone(),
        backends.patients,
        backends.doctors,
    ));

    Services {
        schedules: Arc::new(ScheduleCellState {
            config: config.clone(),
            schedules,
            slots,
            permissions: permissions.clone(),
        }),
        appointments: Arc::new(AppointmentCellState {
            config,
            booking,
            rescheduling,
            availability,
            permissions,
        }),
    }
}
