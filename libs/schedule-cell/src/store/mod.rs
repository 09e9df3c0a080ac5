pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ScheduleBlock, ScheduleError};

pub use memory::InMemoryScheduleStore;
pub use supabase::SupabaseScheduleStore;

/// Persistence for recurring weekly schedule blocks.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn list_blocks(&self, doctor_id: Uuid) -> Result<Vec<ScheduleBlock>, ScheduleError>;

    /// All blocks (enabled or not) of one doctor on one ISO weekday.
    async fn list_blocks_for_day(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<ScheduleBlock>, ScheduleError>;

    async fn get_block(&self, block_id: Uuid) -> Result<Option<ScheduleBlock>, ScheduleError>;

    async fn insert_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError>;

    /// Replaces a stored block. `NotFound` if its id is unknown.
    async fn update_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError>;

    /// `NotFound` if the id is unknown.
    async fn delete_block(&self, block_id: Uuid) -> Result<(), ScheduleError>;
}
