use crate::config::DownstreamConfig;
use crate::downstream::Downstream;
use crate::error::{ProcessError, StoreError};
use crate::pool::{Backend, Checkout, ConnectionPool, PoolSnapshot, Transaction, WorkRecord};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Span};

/// Result of a committed unit of work.
#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub struct Processed {
    pub request_id: String,
    #[serde(rename = "duration_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    pub downstream_response: Box<RawValue>,
}

pub struct Coordinator<B> {
    pool: ConnectionPool<B>,
    downstream: Downstream,
}

impl<B: Backend> Coordinator<B> {
    pub fn new(pool: ConnectionPool<B>, downstream: &DownstreamConfig) -> Self {
        Self {
            pool,
            downstream: Downstream::new(downstream),
        }
    }

    pub fn pool(&self) -> &ConnectionPool<B> {
        &self.pool
    }

    /// Process one unit of work.
    ///
    /// The transaction, and with it the pool slot, stays open for the entire downstream call.
    #[instrument(name = "process", skip_all, fields(request_id = tracing::field::Empty))]
    pub async fn process(&self) -> Result<Processed, ProcessError> {
        let start = Instant::now();
        let request_id = request_id();
        Span::current().record("request_id", request_id.as_str());

        let res = self.run(&request_id, start).await;
        match &res {
            Ok(processed) => {
                debug!("Committed in {:?}", processed.duration);
                metrics::counter!("coordinator.process.success").increment(1);
            }
            Err(err) => {
                warn!("Failed: {err}");
                metrics::counter!("coordinator.process.error", "kind" => err.kind()).increment(1);
            }
        }
        res
    }

    /// Pool occupancy. Has no side effects.
    pub fn health(&self) -> PoolSnapshot {
        self.pool.snapshot()
    }

    async fn run(&self, request_id: &str, start: Instant) -> Result<Processed, ProcessError> {
        let mut checkout = self.pool.try_begin().await.map_err(|err| match err {
            StoreError::PoolExhausted => ProcessError::PoolExhausted,
            err => ProcessError::Begin(err),
        })?;
        metrics::gauge!("coordinator.pool.in_use").set(self.pool.snapshot().in_use as f64);

        let call_start = Instant::now();
        let downstream_response = match self.downstream.call(request_id).await {
            Ok(body) => body,
            Err(err) => {
                abandon(checkout).await;
                return Err(err.into());
            }
        };
        let external_duration = call_start.elapsed();
        metrics::histogram!("coordinator.downstream.latency")
            .record(external_duration.as_secs_f64());

        let record = WorkRecord {
            request_id: request_id.to_string(),
            processed_at: OffsetDateTime::now_utc(),
            external_duration,
        };
        if let Err(err) = checkout.insert(&record).await {
            abandon(checkout).await;
            return Err(ProcessError::Persistence(err));
        }

        checkout.commit().await.map_err(ProcessError::Commit)?;

        Ok(Processed {
            request_id: record.request_id,
            duration: start.elapsed(),
            downstream_response,
        })
    }
}

async fn abandon<T: Transaction>(checkout: Checkout<T>) {
    if let Err(err) = checkout.rollback().await {
        error!("Rollback failed: {err}");
    }
}

/// Eight hex characters. Collisions only affect readability.
fn request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
