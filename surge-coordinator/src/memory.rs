//! In-memory storage backend with failure injection, used by unit tests.
use crate::error::StoreError;
use crate::pool::{Backend, Transaction, WorkRecord};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub(crate) struct MemoryBackend {
    pub(crate) fail_begin: bool,
    pub(crate) fail_insert: bool,
    pub(crate) fail_commit: bool,
    pub(crate) committed: Arc<Mutex<Vec<WorkRecord>>>,
    pub(crate) rollbacks: Arc<AtomicU32>,
}

impl MemoryBackend {
    pub fn committed(&self) -> Vec<WorkRecord> {
        self.committed.lock().unwrap().clone()
    }

    pub fn rollbacks(&self) -> u32 {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl Backend for MemoryBackend {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        if self.fail_begin {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(MemoryTx {
            backend: self.clone(),
            pending: vec![],
        })
    }

    fn idle(&self) -> u32 {
        0
    }

    fn size(&self) -> u32 {
        0
    }
}

pub(crate) struct MemoryTx {
    backend: MemoryBackend,
    pending: Vec<WorkRecord>,
}

impl Transaction for MemoryTx {
    async fn insert(&mut self, record: &WorkRecord) -> Result<(), StoreError> {
        if self.backend.fail_insert {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "insert rejected".to_string(),
            )));
        }
        self.pending.push(record.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.backend.fail_commit {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "commit rejected".to_string(),
            )));
        }
        self.backend.committed.lock().unwrap().extend(self.pending);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.backend.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::OffsetDateTime;

    fn record() -> WorkRecord {
        WorkRecord {
            request_id: "0badf00d".to_string(),
            processed_at: OffsetDateTime::now_utc(),
            external_duration: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn failure_flags_share_state_with_clones() {
        let backend = MemoryBackend {
            fail_commit: true,
            ..MemoryBackend::default()
        };

        let mut tx = backend.begin().await.unwrap();
        tx.insert(&record()).await.unwrap();
        assert!(tx.commit().await.is_err());
        assert!(backend.committed().is_empty());

        let rolled_back = MemoryBackend {
            fail_insert: true,
            ..backend.clone()
        };
        let mut tx = rolled_back.begin().await.unwrap();
        assert!(tx.insert(&record()).await.is_err());
        tx.rollback().await.unwrap();
        assert_eq!(backend.rollbacks(), 1);
    }
}
