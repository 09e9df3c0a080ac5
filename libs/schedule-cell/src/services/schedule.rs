// libs/schedule-cell/src/services/schedule.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    CreateScheduleBlockRequest, ScheduleBlock, ScheduleError, UpdateScheduleBlockRequest,
};
use crate::store::ScheduleStore;

/// Per-(doctor, weekday) block lists. A doctor's generation is bumped on every
/// invalidation, so a fill that read the store before it is discarded.
#[derive(Default)]
struct DayCache {
    blocks: HashMap<(Uuid, i32), Vec<ScheduleBlock>>,
    generations: HashMap<Uuid, u64>,
}

impl DayCache {
    fn generation(&self, doctor_id: Uuid) -> u64 {
        self.generations.get(&doctor_id).copied().unwrap_or(0)
    }
}

/// Validated CRUD over a doctor's schedule blocks, with a per-weekday read cache.
pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
    reject_overlaps: bool,
    day_cache: RwLock<DayCache>,
    write_lock: Mutex<()>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn ScheduleStore>, reject_overlaps: bool) -> Self {
        Self {
            store,
            reject_overlaps,
            day_cache: RwLock::new(DayCache::default()),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn list_blocks(&self, doctor_id: Uuid) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        debug!("Listing schedule blocks for doctor {}", doctor_id);
        self.store.list_blocks(doctor_id).await
    }

    /// Blocks of one weekday as stored, served from cache when possible.
    pub async fn blocks_for_day(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        let generation = {
            let cache = self.day_cache.read().await;
            if let Some(cached) = cache.blocks.get(&(doctor_id, day_of_week)) {
                return Ok(cached.clone());
            }
            cache.generation(doctor_id)
        };

        let blocks = self.store.list_blocks_for_day(doctor_id, day_of_week).await?;

        let mut cache = self.day_cache.write().await;
        if cache.generation(doctor_id) == generation {
            cache.blocks.insert((doctor_id, day_of_week), blocks.clone());
        } else {
            debug!("Schedule of doctor {} changed during read, not caching", doctor_id);
        }
        Ok(blocks)
    }

    pub async fn create_block(
        &self,
        doctor_id: Uuid,
        request: CreateScheduleBlockRequest,
    ) -> Result<ScheduleBlock, ScheduleError> {
        let mut block = ScheduleBlock::new(
            doctor_id,
            request.day_of_week,
            request.start_time,
            request.end_time,
            request.slot_duration_minutes,
        );
        block.is_available = request.is_available.unwrap_or(true);
        block.validate()?;

        let _guard = self.write_lock.lock().await;
        self.ensure_no_overlap(&block).await?;

        let created = self.store.insert_block(block).await?;
        self.invalidate(doctor_id).await;

        info!(
            "Created schedule block {} for doctor {} on day {} ({}-{})",
            created.id, doctor_id, created.day_of_week, created.start_time, created.end_time
        );
        Ok(created)
    }

    pub async fn update_block(
        &self,
        doctor_id: Uuid,
        block_id: Uuid,
        request: UpdateScheduleBlockRequest,
    ) -> Result<ScheduleBlock, ScheduleError> {
        let _guard = self.write_lock.lock().await;

        let mut block = self.owned_block(doctor_id, block_id).await?;
        request.apply_to(&mut block);
        block.validate()?;
        self.ensure_no_overlap(&block).await?;

        let updated = self.store.update_block(block).await?;
        self.invalidate(doctor_id).await;

        info!("Updated schedule block {} for doctor {}", block_id, doctor_id);
        Ok(updated)
    }

    /// Removes a block. Appointments already booked inside it are left untouched.
    pub async fn delete_block(&self, doctor_id: Uuid, block_id: Uuid) -> Result<(), ScheduleError> {
        let _guard = self.write_lock.lock().await;

        self.owned_block(doctor_id, block_id).await?;
        self.store.delete_block(block_id).await?;
        self.invalidate(doctor_id).await;

        info!("Deleted schedule block {} for doctor {}", block_id, doctor_id);
        Ok(())
    }

    async fn owned_block(&self, doctor_id: Uuid, block_id: Uuid) -> Result<ScheduleBlock, ScheduleError> {
        match self.store.get_block(block_id).await? {
            Some(block) if block.doctor_id == doctor_id => Ok(block),
            _ => Err(ScheduleError::NotFound),
        }
    }

    async fn ensure_no_overlap(&self, candidate: &ScheduleBlock) -> Result<(), ScheduleError> {
        if !self.reject_overlaps || !candidate.is_available {
            return Ok(());
        }

        let same_day = self
            .store
            .list_blocks_for_day(candidate.doctor_id, candidate.day_of_week)
            .await?;

        if let Some(existing) = same_day
            .iter()
            .filter(|existing| existing.id != candidate.id && existing.is_available)
            .find(|existing| existing.overlaps(candidate))
        {
            warn!(
                "Schedule block for doctor {} overlaps existing block {}",
                candidate.doctor_id, existing.id
            );
            return Err(ScheduleError::Overlap {
                existing_id: existing.id,
                existing_window: format!(
                    "{}-{}",
                    existing.start_time.format("%H:%M"),
                    existing.end_time.format("%H:%M")
                ),
            });
        }

        Ok(())
    }

    async fn invalidate(&self, doctor_id: Uuid) {
        let mut cache = self.day_cache.write().await;
        cache
            .blocks
            .retain(|(cached_doctor, _), _| *cached_doctor != doctor_id);
        *cache.generations.entry(doctor_id).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryScheduleStore;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Stalls the first armed weekday read after it has read the store.
    #[derive(Default)]
    struct StallingStore {
        inner: InMemoryScheduleStore,
        armed: AtomicBool,
        reached: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ScheduleStore for StallingStore {
        async fn list_blocks(&self, doctor_id: Uuid) -> Result<Vec<ScheduleBlock>, ScheduleError> {
            self.inner.list_blocks(doctor_id).await
        }

        async fn list_blocks_for_day(
            &self,
            doctor_id: Uuid,
            day_of_week: i32,
        ) -> Result<Vec<ScheduleBlock>, ScheduleError> {
            let blocks = self.inner.list_blocks_for_day(doctor_id, day_of_week).await;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            blocks
        }

        async fn get_block(&self, block_id: Uuid) -> Result<Option<ScheduleBlock>, ScheduleError> {
            self.inner.get_block(block_id).await
        }

        async fn insert_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError> {
            self.inner.insert_block(block).await
        }

        async fn update_block(&self, block: ScheduleBlock) -> Result<ScheduleBlock, ScheduleError> {
            self.inner.update_block(block).await
        }

        async fn delete_block(&self, block_id: Uuid) -> Result<(), ScheduleError> {
            self.inner.delete_block(block_id).await
        }
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn request(day: i32, start: NaiveTime, end: NaiveTime) -> CreateScheduleBlockRequest {
        CreateScheduleBlockRequest {
            day_of_week: day,
            start_time: start,
            end_time: end,
            slot_duration_minutes: 30,
            is_available: None,
        }
    }

    fn service(reject_overlaps: bool) -> ScheduleService {
        ScheduleService::new(Arc::new(InMemoryScheduleStore::new()), reject_overlaps)
    }

    #[tokio::test]
    async fn test_overlapping_enabled_blocks_are_rejected() {
        let service = service(true);
        let doctor_id = Uuid::new_v4();

        let morning = service.create_block(doctor_id, request(1, time(9, 0), time(12, 0))).await.unwrap();
        let result = service.create_block(doctor_id, request(1, time(11, 30), time(13, 0))).await;

        assert_matches!(result, Err(ScheduleError::Overlap { existing_id, .. }) if existing_id == morning.id);
        assert!(service.create_block(doctor_id, request(1, time(12, 0), time(13, 0))).await.is_ok());
    }

    #[tokio::test]
    async fn test_overlap_allowed_when_disabled_or_policy_off() {
        let doctor_id = Uuid::new_v4();

        let strict = service(true);
        strict.create_block(doctor_id, request(2, time(9, 0), time(12, 0))).await.unwrap();
        let mut disabled = request(2, time(10, 0), time(11, 0));
        disabled.is_available = Some(false);
        assert!(strict.create_block(doctor_id, disabled).await.is_ok());

        let lenient = service(false);
        lenient.create_block(doctor_id, request(2, time(9, 0), time(12, 0))).await.unwrap();
        assert!(lenient.create_block(doctor_id, request(2, time(10, 0), time(11, 0))).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_block() {
        let service = service(true);
        let doctor_id = Uuid::new_v4();

        let result = service
            .update_block(doctor_id, Uuid::new_v4(), UpdateScheduleBlockRequest::default())
            .await;
        assert_matches!(result, Err(ScheduleError::NotFound));
        assert_matches!(service.delete_block(doctor_id, Uuid::new_v4()).await, Err(ScheduleError::NotFound));
    }

    #[tokio::test]
    async fn test_block_of_other_doctor_is_not_found() {
        let service = service(true);
        let owner = Uuid::new_v4();
        let block = service.create_block(owner, request(3, time(9, 0), time(10, 0))).await.unwrap();

        assert_matches!(
            service.delete_block(Uuid::new_v4(), block.id).await,
            Err(ScheduleError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_update_rejects_inverted_window() {
        let service = service(true);
        let doctor_id = Uuid::new_v4();
        let block = service.create_block(doctor_id, request(4, time(9, 0), time(10, 0))).await.unwrap();

        let update = UpdateScheduleBlockRequest {
            end_time: Some(time(8, 0)),
            ..Default::default()
        };
        assert_matches!(
            service.update_block(doctor_id, block.id, update).await,
            Err(ScheduleError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn test_cache_is_invalidated_on_write() {
        let service = service(true);
        let doctor_id = Uuid::new_v4();

        assert!(service.blocks_for_day(doctor_id, 5).await.unwrap().is_empty());
        service.create_block(doctor_id, request(5, time(9, 0), time(10, 0))).await.unwrap();
        assert_eq!(service.blocks_for_day(doctor_id, 5).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fill_overtaken_by_a_write_is_not_cached() {
        let store = Arc::new(StallingStore::default());
        let service = Arc::new(ScheduleService::new(store.clone(), true));
        let doctor_id = Uuid::new_v4();

        store.armed.store(true, Ordering::SeqCst);
        let reader = {
            let service = service.clone();
            tokio::spawn(async move { service.blocks_for_day(doctor_id, 7).await })
        };
        store.reached.notified().await;

        service.create_block(doctor_id, request(7, time(9, 0), time(10, 0))).await.unwrap();
        store.release.notify_one();

        assert!(reader.await.unwrap().unwrap().is_empty());
        assert_eq!(service.blocks_for_day(doctor_id, 7).await.unwrap().len(), 1);
    }
}
