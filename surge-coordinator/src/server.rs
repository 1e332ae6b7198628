use crate::coordinator::{Coordinator, Processed};
use crate::error::ProcessError;
use crate::pool::{Backend, PoolSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub fn router<B: Backend>(coordinator: Arc<Coordinator<B>>) -> Router {
    Router::new()
        .route("/process", post(process::<B>))
        .route("/health", get(health::<B>))
        .with_state(coordinator)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub async fn serve<B: Backend>(
    listener: TcpListener,
    coordinator: Arc<Coordinator<B>>,
) -> std::io::Result<()> {
    debug!("Coordinator listening on {}", listener.local_addr()?);
    axum::serve(listener, router(coordinator)).await
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub pool: PoolSnapshot,
}

struct HandlerError(ProcessError);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ProcessError::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            ProcessError::Begin(_)
            | ProcessError::Upstream(_)
            | ProcessError::Persistence(_)
            | ProcessError::Commit(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn process<B: Backend>(
    State(coordinator): State<Arc<Coordinator<B>>>,
) -> Result<Json<Processed>, HandlerError> {
    coordinator.process().await.map(Json).map_err(HandlerError)
}

async fn health<B: Backend>(State(coordinator): State<Arc<Coordinator<B>>>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        pool: coordinator.health(),
    })
}
