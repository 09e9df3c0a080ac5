pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::{appointment_routes, AppointmentCellState};
pub use services::{
    AvailabilityResolver, BookingLocks, BookingService, DoctorDirectory, DoctorProfile,
    InMemoryDirectory, PatientDirectory, ReschedulingService, SupabaseDirectory,
};
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
