use crate::{ErrorCategory, RequestOutcome, TestMode, P95_QUANTILE};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSecondsWithFrac, DurationSecondsWithFrac};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Latency statistics over every outcome of a run, successful or not.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub mean: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p95: Duration,
}

impl LatencyStats {
    /// Expects outcomes sorted by duration ascending. `None` for an empty run.
    fn from_sorted(sorted: &[RequestOutcome]) -> Option<Self> {
        let min = sorted.first()?.duration;
        let max = sorted.last()?.duration;

        let total_nanos: u128 = sorted.iter().map(|o| o.duration.as_nanos()).sum();
        let mean_nanos = total_nanos / sorted.len() as u128;
        let mean = Duration::from_nanos(u64::try_from(mean_nanos).unwrap_or(u64::MAX));

        // NOTE: floor(n * 0.95) is n - 1 for every n <= 20, so small runs report max as p95.
        let idx = (sorted.len() as f64 * P95_QUANTILE).floor() as usize;
        let p95 = sorted.get(idx).map(|o| o.duration).unwrap_or_default();

        Some(Self { mean, min, max, p95 })
    }
}

/// Aggregate over one completed run. Built once, never mutated afterwards.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub run_id: u64,
    pub test: TestMode,
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Percentage in `[0, 100]`.
    pub success_rate: f64,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub total_duration: Duration,
    pub latency: Option<LatencyStats>,
    pub errors: BTreeMap<ErrorCategory, u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

impl TestSummary {
    /// Aggregate a closed outcome stream.
    ///
    /// Outcomes are sorted by duration, ties broken by sequence number, before
    /// any statistic is taken.
    pub fn from_outcomes(
        run_id: u64,
        test: TestMode,
        mut outcomes: Vec<RequestOutcome>,
        started_at: OffsetDateTime,
        total_duration: Duration,
    ) -> Self {
        outcomes.sort_by_key(|o| (o.duration, o.sequence));

        let total_requests = outcomes.len() as u64;
        let success_count = outcomes.iter().filter(|o| o.success).count() as u64;
        let failure_count = total_requests - success_count;
        let success_rate = if total_requests == 0 {
            0.
        } else {
            success_count as f64 / total_requests as f64 * 100.
        };

        let mut errors = BTreeMap::new();
        for category in outcomes.iter().filter_map(RequestOutcome::category) {
            *errors.entry(category).or_insert(0) += 1;
        }

        Self {
            run_id,
            test,
            total_requests,
            success_count,
            failure_count,
            success_rate,
            total_duration,
            latency: LatencyStats::from_sorted(&outcomes),
            errors,
            started_at,
            finished_at: started_at + total_duration,
        }
    }
}

impl fmt::Display for TestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run={}, Requests={}, Success={:.2}%, Elapsed={}",
            self.run_id,
            self.total_requests,
            self.success_rate,
            humantime::format_duration(self.total_duration),
        )?;
        if let Some(latency) = &self.latency {
            write!(
                f,
                ", mean={:?}, min={:?}, max={:?}, p95={:?}",
                latency.mean, latency.min, latency.max, latency.p95
            )?;
        }
        for (category, count) in &self.errors {
            write!(f, ", {category}={count}")?;
        }
        Ok(())
    }
}
