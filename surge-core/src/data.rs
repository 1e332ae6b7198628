use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// What a single call to the target produced.
///
/// `status` is the HTTP status of the response, or `0` when no response was
/// received at all (transport failure, timeout).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallReport {
    pub status: u16,
    pub error: Option<String>,
}

impl CallReport {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(error.into()),
        }
    }

    /// Only a 2xx response counts as a full success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }
}

/// One dispatched call, recorded once it has finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOutcome {
    pub sequence: u64,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub duration: Duration,
    pub status: u16,
    pub success: bool,
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn new(
        sequence: u64,
        started_at: OffsetDateTime,
        duration: Duration,
        report: CallReport,
    ) -> Self {
        Self {
            sequence,
            started_at,
            finished_at: started_at + duration,
            duration,
            success: report.is_success(),
            status: report.status,
            error: report.error,
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        if self.success {
            None
        } else {
            Some(ErrorCategory::classify(self.status, self.error.as_deref()))
        }
    }
}

/// Failure classes reported in a [crate::TestSummary].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ConnectionPoolExhausted,
    InternalServerError,
    ConnectionRefused,
    Timeout,
    Other,
}

impl ErrorCategory {
    /// First match wins: status codes take priority over the error text.
    pub fn classify(status: u16, error: Option<&str>) -> Self {
        match status {
            503 => return Self::ConnectionPoolExhausted,
            500 => return Self::InternalServerError,
            _ => {}
        }

        let error = error.map(str::to_lowercase).unwrap_or_default();
        if error.contains("connection refused") {
            Self::ConnectionRefused
        } else if error.contains("timeout") {
            Self::Timeout
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionPoolExhausted => "connection_pool_exhausted",
            Self::InternalServerError => "internal_server_error",
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout => "timeout",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
