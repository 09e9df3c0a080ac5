pub mod availability;
pub mod booking;
pub mod directory;
pub mod lifecycle;
pub mod locks;
pub mod rescheduling;

pub use availability::AvailabilityResolver;
pub use booking::BookingService;
pub use directory::{DoctorDirectory, DoctorProfile, InMemoryDirectory, PatientDirectory, SupabaseDirectory};
pub use lifecycle::AppointmentLifecycleService;
pub use locks::BookingLocks;
pub use rescheduling::ReschedulingService;
