use std::time::Duration;

/// Smallest accepted concurrency or rate.
pub const MIN_LOAD: u32 = 1;

/// Largest accepted concurrency or rate.
pub const MAX_LOAD: u32 = 1_000;

/// Rate-limited runs last this long unless a duration is supplied.
pub const DEFAULT_TEST_DURATION: Duration = Duration::from_secs(30);

/// Hard ceiling on the wall-clock length of a rate-limited run.
pub const MAX_TEST_DURATION: Duration = Duration::from_secs(300);

/// Per-call timeout used by the load generator when nothing else is configured.
///
/// Kept above the coordinator's default downstream timeout so that a slow
/// dependency surfaces as a coordinator failure rather than a client timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Quantile reported as `p95` in a [crate::TestSummary].
pub const P95_QUANTILE: f64 = 0.95;
