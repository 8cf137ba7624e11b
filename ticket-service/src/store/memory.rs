use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use shared::ResourceStatus;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{StoreTransaction, TicketStore};
use crate::error::StoreError;
use crate::models::{Reservation, Resource};

#[derive(Debug, Default)]
struct MemoryState {
    resources: HashMap<Uuid, Resource>,
    reservations: Vec<Reservation>,
}

#[derive(Debug, Default)]
struct Faults {
    commits: AtomicUsize,
    reservation_inserts: AtomicUsize,
}

impl Faults {
    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-process store with serializable transactions.
///
/// A transaction holds the store lock from `begin` until it is committed,
/// rolled back or dropped. Its writes are staged and only applied on commit.
#[derive(Clone, Default)]
pub struct MemoryTicketStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged_resources: HashMap<Uuid, Resource>,
    staged_reservations: Vec<Reservation>,
    faults: Arc<Faults>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a resource with `available_quota == total_quota`.
    pub async fn insert_resource(&self, name: &str, total_quota: i32) -> Resource {
        let resource = Resource::new(name, total_quota);
        self.state
            .lock()
            .await
            .resources
            .insert(resource.id, resource.clone());
        resource
    }

    pub async fn resource(&self, id: Uuid) -> Option<Resource> {
        self.state.lock().await.resources.get(&id).cloned()
    }

    /// Reservations for `resource_id` in creation order.
    pub async fn reservations_for(&self, resource_id: Uuid) -> Vec<Reservation> {
        self.state
            .lock()
            .await
            .reservations
            .iter()
            .filter(|r| r.resource_id == resource_id)
            .cloned()
            .collect()
    }

    /// Makes the next `count` commits fail after all writes were staged.
    pub fn fail_next_commits(&self, count: usize) {
        self.faults.commits.fetch_add(count, Ordering::SeqCst);
    }

    /// Makes the next `count` reservation inserts fail inside the transaction.
    pub fn fail_next_reservation_inserts(&self, count: usize) {
        self.faults.reservation_inserts.fetch_add(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(MemoryTransaction {
            guard,
            staged_resources: HashMap::new(),
            staged_reservations: Vec::new(),
            faults: Arc::clone(&self.faults),
        })
    }

    async fn resource_status(&self, id: Uuid) -> Result<Option<ResourceStatus>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.resources.get(&id).map(|resource| {
            let reserved = state
                .reservations
                .iter()
                .filter(|r| r.resource_id == id && r.is_success())
                .count() as i64;
            resource.status(reserved)
        }))
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get_resource(&mut self, id: Uuid) -> Result<Option<Resource>, StoreError> {
        if let Some(staged) = self.staged_resources.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.guard.resources.get(&id).cloned())
    }

    async fn save_resource(&mut self, resource: &Resource) -> Result<(), StoreError> {
        let current_version = self
            .staged_resources
            .get(&resource.id)
            .or_else(|| self.guard.resources.get(&resource.id))
            .map(|r| r.version);

        if current_version != Some(resource.version) {
            return Err(StoreError::VersionConflict {
                resource_id: resource.id,
                expected: resource.version,
            });
        }

        let mut saved = resource.clone();
        saved.version += 1;
        self.staged_resources.insert(saved.id, saved);
        Ok(())
    }

    async fn create_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        if Faults::take(&self.faults.reservation_inserts) {
            return Err(StoreError::Unavailable("reservation insert failed".to_string()));
        }
        self.staged_reservations.push(reservation.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if Faults::take(&self.faults.commits) {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }
        let staged_resources = std::mem::take(&mut self.staged_resources);
        let staged_reservations = std::mem::take(&mut self.staged_reservations);
        self.guard.resources.extend(staged_resources);
        self.guard.reservations.extend(staged_reservations);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
