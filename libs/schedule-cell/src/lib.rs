pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::{schedule_routes, ScheduleCellState};
pub use services::{ScheduleService, SlotGenerator};
pub use store::{InMemoryScheduleStore, ScheduleStore, SupabaseScheduleStore};
