//! Transactional persistence for resources and reservations.
//!
//! The fulfillment stage only talks to [`TicketStore`] and [`StoreTransaction`].
//! Writes made through a transaction become visible to other readers on
//! [`StoreTransaction::commit`] and are discarded as a unit on
//! [`StoreTransaction::rollback`].

mod memory;
mod postgres;

pub use memory::{MemoryTicketStore, MemoryTransaction};
pub use postgres::{PgTicketStore, PgTransaction};

use async_trait::async_trait;
use shared::ResourceStatus;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Reservation, Resource};

#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    type Tx: StoreTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Committed view of a resource plus its count of successful reservations.
    async fn resource_status(&self, id: Uuid) -> Result<Option<ResourceStatus>, StoreError>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a resource and holds it against concurrent writers until the
    /// transaction ends.
    async fn get_resource(&mut self, id: Uuid) -> Result<Option<Resource>, StoreError>;

    /// Persists `resource` if its `version` still matches the stored row and
    /// bumps the stored version. Fails with [`StoreError::VersionConflict`]
    /// otherwise.
    async fn save_resource(&mut self, resource: &Resource) -> Result<(), StoreError>;

    async fn create_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
