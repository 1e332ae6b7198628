use crate::dispatch::dispatch;
use arc_swap::ArcSwapOption;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use surge_core::{CallReport, TestConfig, TestSummary, DEFAULT_REQUEST_TIMEOUT};
use time::OffsetDateTime;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, Span};

/// Runs load tests against a target and keeps the summary of the most recently
/// completed one.
///
/// The current summary is swapped in as a whole once a run has finished, so a
/// reader sees either the previous summary or the new one, never a partial one.
pub struct LoadGenerator<T> {
    target: T,
    request_timeout: Duration,
    current: ArcSwapOption<TestSummary>,
    runs: AtomicU64,
}

impl<T, F> LoadGenerator<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = CallReport> + Send + 'static,
{
    pub fn new(target: T) -> Self {
        Self {
            target,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            current: ArcSwapOption::empty(),
            runs: AtomicU64::new(0),
        }
    }

    /// Per-call timeout applied to runs started through [Self::run_with_defaults].
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn default_request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Run a test, publish its summary and return it.
    #[instrument(name = "test", skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run(&self, config: TestConfig) -> Arc<TestSummary> {
        let run_id = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        Span::current().record("run_id", run_id);
        info!("Running with config {config:?}");

        let started_at = OffsetDateTime::now_utc();
        let start = Instant::now();
        let outcomes = dispatch(&self.target, &config).await;

        let summary = Arc::new(TestSummary::from_outcomes(
            run_id,
            config.mode,
            outcomes,
            started_at,
            start.elapsed(),
        ));
        info!("Test complete: {summary}");

        self.current.store(Some(summary.clone()));
        summary
    }

    /// Like [Self::run], with this generator's request timeout.
    pub async fn run_with_defaults(&self, config: TestConfig) -> Arc<TestSummary> {
        let config = config.request_timeout(self.request_timeout);
        self.run(config).await
    }

    /// Summary of the last completed run, if any.
    pub fn status(&self) -> Option<Arc<TestSummary>> {
        self.current.load_full()
    }
}
