use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ScheduleBlock, ScheduleError};
use crate::store::ScheduleStore;

/// Process-local schedule store. Keeps insertion order.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    blocks: RwLock<Vec<ScheduleBlock>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: Vec<ScheduleBlock>) -> Self {
        Self {
            blocks: RwLock::new(blocks),
        }
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn list_blocks(&self, doctor_id: Uuid) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        let blocks = self.blocks.read().await;
        Ok(blocks
            .iter()
            .filter(|block| block.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    async fn list_blocks_for_day(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        let blocks = self.blocks.read().await;
        Ok(blocks
            .iter()
            .filter(|block| block.doctor_id == doctor_id && block.day_of_week == day_of_week)
            .cloned()
            .collect())
    }

    async fn get_block(&self, block_id: Uuid) -> Result<Option<ScheduleBlock>, ScheduleError> {
        let blocks = self.blocks.read().await;
        Ok(blocks.iter().find(|block| block.id == block_id).cloned())
    }

    async fn insert_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError> {
        let mut blocks = self.blocks.write().await;
        blocks.push(block.clone());
        Ok(block)
    }

    async fn update_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError> {
        let mut blocks = self.blocks.write().await;
        let slot = blocks
            .iter_mut()
            .find(|existing| existing.id == block.id)
            .ok_or(ScheduleError::NotFound)?;
        *slot = block.clone();
        Ok(block)
    }

    async fn delete_block(&self, block_id: Uuid) -> Result<(), ScheduleError> {
        let mut blocks = self.blocks.write().await;
        let before = blocks.len();
        blocks.retain(|block| block.id != block_id);
        if blocks.len() == before {
            return Err(ScheduleError::NotFound);
        }
        Ok(())
    }
}
