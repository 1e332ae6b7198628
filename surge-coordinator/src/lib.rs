//! Transaction coordinator.
//!
//! Processes one unit of work per request: take a pooled connection, open a
//! transaction, call the slow downstream while the transaction is open, persist
//! a [WorkRecord] and commit. The connection is held for the whole downstream
//! call, so downstream latency translates directly into pool occupancy.
pub mod config;
pub mod coordinator;
pub mod downstream;
pub mod error;
pub mod pool;
pub mod server;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod memory;

pub use crate::config::{DownstreamConfig, PoolConfig};
pub use crate::coordinator::{Coordinator, Processed};
pub use crate::error::{ProcessError, StoreError, UpstreamError};
pub use crate::pool::{Backend, ConnectionPool, PoolSnapshot, Transaction, WorkRecord};
pub use crate::sqlite::SqliteBackend;
