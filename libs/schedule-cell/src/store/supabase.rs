use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{ScheduleBlock, ScheduleError};
use crate::store::ScheduleStore;

const TABLE: &str = "/rest/v1/doctor_schedules";

/// Schedule store backed by the `doctor_schedules` PostgREST table.
pub struct SupabaseScheduleStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        let blocks: Vec<ScheduleBlock> = self.supabase.request(Method::GET, path, None, None).await?;
        Ok(blocks)
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn list_blocks(&self, doctor_id: Uuid) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        let path = format!(
            "{}?doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            TABLE, doctor_id
        );
        self.fetch(&path).await
    }

    async fn list_blocks_for_day(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        let path = format!(
            "{}?doctor_id=eq.{}&day_of_week=eq.{}&order=start_time.asc",
            TABLE, doctor_id, day_of_week
        );
        self.fetch(&path).await
    }

    async fn get_block(&self, block_id: Uuid) -> Result<Option<ScheduleBlock>, ScheduleError> {
        let path = format!("{}?id=eq.{}", TABLE, block_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn insert_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError> {
        debug!("Inserting schedule block {} for doctor {}", block.id, block.doctor_id);
        let body = serde_json::to_value(&block)
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        let rows: Vec<ScheduleBlock> = self
            .supabase
            .request(Method::POST, TABLE, None, Some(body))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ScheduleError::DatabaseError("Failed to create schedule block".to_string()))
    }

    async fn update_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError> {
        let path = format!("{}?id=eq.{}", TABLE, block.id);
        let body = serde_json::to_value(&block)
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        let rows: Vec<ScheduleBlock> = self
            .supabase
            .request(Method::PATCH, &path, None, Some(body))
            .await?;

        rows.into_iter().next().ok_or(ScheduleError::NotFound)
    }

    async fn delete_block(&self, block_id: Uuid) -> Result<(), ScheduleError> {
        let path = format!("{}?id=eq.{}", TABLE, block_id);
        let rows: Vec<ScheduleBlock> = self.supabase.request(Method::DELETE, &path, None, None).await?;

        if rows.is_empty() {
            return Err(ScheduleError::NotFound);
        }
        Ok(())
    }
}
