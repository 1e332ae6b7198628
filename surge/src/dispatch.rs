use futures_util::FutureExt;
use governor::{Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use surge_core::{CallReport, RequestOutcome, TestConfig, TestMode};
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Dispatch every call `config` asks for and return their outcomes.
///
/// Returns only once every dispatched call has reported, so the result is always the
/// complete outcome set of the run.
pub(crate) async fn dispatch<T, F>(target: &T, config: &TestConfig) -> Vec<RequestOutcome>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = CallReport> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut workers = Workers {
        tasks: JoinSet::new(),
        results: tx,
        request_timeout: config.request_timeout,
        next_sequence: 0,
    };

    match config.mode {
        TestMode::Concurrency { concurrency } => {
            for _ in 0..concurrency.get() {
                workers.spawn(target());
            }
        }
        TestMode::Rate { rate, duration } => {
            rate_limited(&mut workers, target, rate, duration).await;
        }
    }

    let dispatched = workers.next_sequence;
    debug!("Dispatched {dispatched} calls, waiting for them to drain.");
    workers.join().await;

    let mut outcomes = Vec::with_capacity(dispatched as usize);
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }
    if outcomes.len() as u64 != dispatched {
        error!(
            "Dispatched {dispatched} calls but {} reported.",
            outcomes.len()
        );
    }
    outcomes
}

async fn rate_limited<T, F>(
    workers: &mut Workers,
    target: &T,
    rate: NonZeroU32,
    duration: Duration,
) where
    T: Fn() -> F,
    F: Future<Output = CallReport> + Send + 'static,
{
    let limiter = RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN));
    let deadline = tokio::time::Instant::now() + duration;

    loop {
        tokio::select! {
            biased;
            _ = tokio::time::sleep_until(deadline) => break,
            _ = limiter.until_ready() => workers.spawn(target()),
        }
    }
}

struct Workers {
    tasks: JoinSet<()>,
    results: UnboundedSender<RequestOutcome>,
    request_timeout: Duration,
    next_sequence: u64,
}

impl Workers {
    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = CallReport> + Send + 'static,
    {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.tasks.spawn(record_call(
            sequence,
            call,
            self.request_timeout,
            self.results.clone(),
        ));
    }

    /// Wait for every worker. Closes the result stream once the last one is done.
    async fn join(self) {
        let Workers {
            mut tasks, results, ..
        } = self;
        drop(results);

        while let Some(res) = tasks.join_next().await {
            if let Err(err) = res {
                error!("Worker task failed: {err}");
            }
        }
    }
}

async fn record_call<F>(
    sequence: u64,
    call: F,
    request_timeout: Duration,
    results: UnboundedSender<RequestOutcome>,
) where
    F: Future<Output = CallReport> + Send,
{
    let started_at = OffsetDateTime::now_utc();
    let start = Instant::now();

    let guarded = AssertUnwindSafe(call).catch_unwind();
    let report = match tokio::time::timeout(request_timeout, guarded).await {
        Ok(Ok(report)) => report,
        Ok(Err(_)) => CallReport::failed(0, "call panicked"),
        Err(_) => CallReport::failed(
            0,
            format!(
                "request timeout after {}",
                humantime::format_duration(request_timeout)
            ),
        ),
    };
    let elapsed = start.elapsed();

    #[cfg(feature = "metrics")]
    {
        metrics::histogram!("surge.requests.latency").record(elapsed.as_nanos() as f64);
        if report.is_success() {
            metrics::counter!("surge.requests.success").increment(1);
        } else {
            metrics::counter!("surge.requests.error").increment(1);
        }
    }

    if let Some(err) = &report.error {
        trace!("Call {sequence} failed with status {}: {err}", report.status);
    }

    let outcome = RequestOutcome::new(sequence, started_at, elapsed, report);
    if results.send(outcome).is_err() {
        error!("Result stream closed before call {sequence} reported.");
    }
}
