//! Slow downstream dependency.
//!
//! Every `GET /slow` sleeps for the configured delay and then answers with a small JSON body.
use axum::{
    debug_handler,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use time::OffsetDateTime;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct StubConfig {
    pub delay: Duration,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowResponse {
    pub request_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SlowQuery {
    request_id: Option<String>,
}

#[derive(Clone)]
pub struct Stub {
    config: StubConfig,
    served: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
}

impl Stub {
    pub fn new(config: StubConfig) -> Self {
        Self {
            config,
            served: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/slow", get(slow))
            .with_state(self.clone())
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Total requests answered since startup.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Requests currently sleeping inside `/slow`.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Log how many requests were answered each second, and how many are still in flight.
    pub async fn throughput_task(self) {
        let mut last = 0;
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            let served = self.served();
            let in_flight = self.in_flight();
            if served != last || in_flight > 0 {
                info!("{} req/s, {in_flight} in flight", served - last);
                last = served;
            }
        }
    }
}

/// Counts one in-flight request until dropped.
struct InFlight(Arc<AtomicU64>);

impl InFlight {
    fn enter(counter: &Arc<AtomicU64>) -> Self {
        let current = counter.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("mock-service.in_flight").set(current as f64);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let current = self.0.fetch_sub(1, Ordering::Relaxed) - 1;
        metrics::gauge!("mock-service.in_flight").set(current as f64);
    }
}

pub async fn run(addr: SocketAddr, stub: Stub) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Serving /slow on {} with a {} delay",
        listener.local_addr()?,
        humantime::format_duration(stub.config.delay)
    );
    axum::serve(listener, stub.router()).await
}

#[debug_handler]
async fn slow(State(stub): State<Stub>, Query(query): Query<SlowQuery>) -> Json<SlowResponse> {
    metrics::counter!("mock-service.requests").increment(1);
    let guard = InFlight::enter(&stub.in_flight);
    tokio::time::sleep(stub.config.delay).await;
    drop(guard);
    stub.served.fetch_add(1, Ordering::Relaxed);

    let request_id = query
        .request_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    debug!("Answering {request_id}");

    Json(SlowResponse {
        request_id,
        timestamp: OffsetDateTime::now_utc(),
        message: format!(
            "processed after {}",
            humantime::format_duration(stub.config.delay)
        ),
    })
}
