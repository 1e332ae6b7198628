use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            err => Self::Database(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("downstream timeout after {0:?}")]
    Timeout(Duration),

    #[error("downstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("downstream responded with status {0}")]
    Status(u16),

    #[error("downstream body is not JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Failure of a single unit of work. Any open transaction has already been
/// rolled back by the time one of these is returned.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("failed to begin transaction: {0}")]
    Begin(StoreError),

    #[error("upstream failure: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("failed to persist work record: {0}")]
    Persistence(StoreError),

    #[error("failed to commit transaction: {0}")]
    Commit(StoreError),
}

impl ProcessError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PoolExhausted => "pool_exhausted",
            Self::Begin(_) => "begin",
            Self::Upstream(_) => "upstream",
            Self::Persistence(_) => "persistence",
            Self::Commit(_) => "commit",
        }
    }
}
