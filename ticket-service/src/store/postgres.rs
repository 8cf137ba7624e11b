use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use shared::{ReservationStatus, ResourceStatus};
use uuid::Uuid;

use super::{StoreTransaction, TicketStore};
use crate::error::StoreError;
use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct PgTicketStore {
    pool: DbPool,
}

/// An open Postgres transaction on a connection checked out of the pool.
/// Always end it with `commit` or `rollback` before dropping.
pub struct PgTransaction {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

impl PgTicketStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StoreError> {
        let mut conn = self.pool.get_owned().await?;
        AnsiTransactionManager::begin_transaction(&mut *conn).await?;
        Ok(PgTransaction { conn })
    }

    async fn resource_status(&self, id: Uuid) -> Result<Option<ResourceStatus>, StoreError> {
        let mut conn = self.pool.get().await?;

        let resource = resources::table
            .find(id)
            .first::<Resource>(&mut *conn)
            .await
            .optional()?;

        let resource = match resource {
            Some(resource) => resource,
            None => return Ok(None),
        };

        let reserved = reservations::table
            .filter(reservations::resource_id.eq(id))
            .filter(reservations::status.eq(ReservationStatus::Success.as_str()))
            .count()
            .get_result::<i64>(&mut *conn)
            .await?;

        Ok(Some(resource.status(reserved)))
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn get_resource(&mut self, id: Uuid) -> Result<Option<Resource>, StoreError> {
        let resource = resources::table
            .find(id)
            .for_update()
            .get_result::<Resource>(&mut *self.conn)
            .await
            .optional()?;
        Ok(resource)
    }

    async fn save_resource(&mut self, resource: &Resource) -> Result<(), StoreError> {
        let updated = diesel::update(
            resources::table
                .filter(resources::id.eq(resource.id))
                .filter(resources::version.eq(resource.version)),
        )
        .set((
            resources::available_quota.eq(resource.available_quota),
            resources::version.eq(resources::version + 1),
        ))
        .execute(&mut *self.conn)
        .await?;

        if updated == 0 {
            return Err(StoreError::VersionConflict {
                resource_id: resource.id,
                expected: resource.version,
            });
        }
        Ok(())
    }

    async fn create_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        diesel::insert_into(reservations::table)
            .values(reservation)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::commit_transaction(&mut *self.conn).await?;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::rollback_transaction(&mut *self.conn).await?;
        Ok(())
    }
}
