// libs/appointment-cell/src/services/locks.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::models::AppointmentError;
use crate::store::AppointmentStore;

/// Per-doctor booking locks.
///
/// A guard is held from the availability re-check until the store write has
/// returned, so two requests for the same doctor never interleave there.
#[derive(Default)]
pub struct BookingLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BookingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only the registry still references are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(doctor_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        debug!("Waiting for booking lock of doctor {}", doctor_id);
        lock.lock_owned().await
    }

    /// Locks the doctor of an existing appointment. The doctor of an
    /// appointment never changes, so callers re-read the record once locked.
    pub async fn acquire_for(
        &self,
        store: &dyn AppointmentStore,
        appointment_id: Uuid,
    ) -> Result<OwnedMutexGuard<()>, AppointmentError> {
        let doctor_id = store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?
            .doctor_id;
        Ok(self.acquire(doctor_id).await)
    }
}
