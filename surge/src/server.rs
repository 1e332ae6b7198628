use crate::generator::LoadGenerator;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use surge_core::{CallReport, ConfigError, TestConfig, TestSummary};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, instrument};

const INFO: &str = "surge load generator

GET /status                            summary of the last completed test
GET /test/{n}                          launch n concurrent requests (1-1000)
GET /test/{n}?duration={s}             send n requests per second for s seconds (1-300)
GET /test/{n}?mode=rate                send n requests per second for 30 seconds
";

pub fn router<T, F>(generator: Arc<LoadGenerator<T>>) -> Router
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = CallReport> + Send + 'static,
{
    Router::new()
        .route("/", get(info))
        .route("/status", get(status::<T, F>))
        .route("/test/:value", get(test::<T, F>))
        .with_state(generator)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub async fn serve<T, F>(
    listener: TcpListener,
    generator: Arc<LoadGenerator<T>>,
) -> std::io::Result<()>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = CallReport> + Send + 'static,
{
    debug!("Load generator listening on {}", listener.local_addr()?);
    axum::serve(listener, router(generator)).await
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ModeParam {
    Concurrency,
    Rate,
}

#[derive(Debug, Deserialize)]
struct TestParams {
    mode: Option<ModeParam>,
    /// Seconds.
    duration: Option<u64>,
}

impl TestParams {
    fn into_config(self, value: u64) -> Result<TestConfig, ConfigError> {
        let duration = self.duration.map(Duration::from_secs);
        match (self.mode, duration) {
            (Some(ModeParam::Concurrency), Some(_)) => Err(ConfigError::DurationWithoutRate),
            (Some(ModeParam::Rate), duration) | (None, duration @ Some(_)) => {
                TestConfig::rate(value, duration)
            }
            (Some(ModeParam::Concurrency), None) | (None, None) => TestConfig::concurrency(value),
        }
    }
}

#[derive(Error, Debug)]
enum HandlerError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("invalid load value {0:?}, expected a whole number")]
    InvalidValue(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

async fn info() -> &'static str {
    INFO
}

async fn status<T, F>(State(generator): State<Arc<LoadGenerator<T>>>) -> Response
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = CallReport> + Send + 'static,
{
    match generator.status() {
        Some(summary) => Json(summary).into_response(),
        None => Json(serde_json::json!({ "message": "no test has been run yet" })).into_response(),
    }
}

#[instrument(skip(generator))]
async fn test<T, F>(
    State(generator): State<Arc<LoadGenerator<T>>>,
    Path(value): Path<String>,
    Query(params): Query<TestParams>,
) -> Result<Json<Arc<TestSummary>>, HandlerError>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = CallReport> + Send + 'static,
{
    let value: u64 = value
        .parse()
        .map_err(|_| HandlerError::InvalidValue(value.clone()))?;
    let config = params.into_config(value)?;

    Ok(Json(generator.run_with_defaults(config).await))
}
