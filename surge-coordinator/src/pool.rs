//! Bounded connection pool.
//!
//! A checkout never waits for capacity: when every slot is taken, [ConnectionPool::try_begin]
//! fails immediately with [StoreError::PoolExhausted]. Slots are counted with a semaphore in
//! front of the storage [Backend], so the number of open transactions can never exceed `max`.
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One successfully processed unit of work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkRecord {
    pub request_id: String,
    pub processed_at: OffsetDateTime,
    pub external_duration: Duration,
}

/// Storage engine behind the pool.
#[trait_variant::make(Backend: Send)]
pub trait LocalBackend: Send + Sync + 'static {
    type Tx: Transaction;

    /// Open a connection (or reuse an idle one) and begin a transaction on it.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Connections currently idle in the driver.
    fn idle(&self) -> u32;

    /// Connections currently open in the driver, idle or not.
    fn size(&self) -> u32;
}

/// An open transaction. Dropping it without committing discards its writes.
#[trait_variant::make(Transaction: Send)]
pub trait LocalTransaction: Send + 'static {
    async fn insert(&mut self, record: &WorkRecord) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Point-in-time pool occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub in_use: u32,
    pub idle: u32,
    pub max: u32,
    pub total: u32,
}

pub struct ConnectionPool<B> {
    backend: B,
    slots: Arc<Semaphore>,
    max: u32,
}

impl<B: Backend> ConnectionPool<B> {
    pub fn new(backend: B, max: u32) -> Self {
        Self {
            backend,
            slots: Arc::new(Semaphore::new(max as usize)),
            max,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Take a slot without waiting and begin a transaction in it.
    pub async fn try_begin(&self) -> Result<Checkout<B::Tx>, StoreError> {
        let slot = self
            .slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| StoreError::PoolExhausted)?;
        let tx = self.backend.begin().await?;
        Ok(Checkout { tx, _slot: slot })
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let available = self.slots.available_permits() as u32;
        PoolSnapshot {
            in_use: self.max.saturating_sub(available),
            idle: self.backend.idle(),
            max: self.max,
            total: self.backend.size(),
        }
    }
}

/// A transaction holding one pool slot. The slot is returned once the
/// checkout is committed, rolled back, or dropped.
pub struct Checkout<T> {
    tx: T,
    _slot: OwnedSemaphorePermit,
}

impl<T: Transaction> Checkout<T> {
    pub async fn insert(&mut self, record: &WorkRecord) -> Result<(), StoreError> {
        self.tx.insert(record).await
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await
    }
}
