//! Helpers for wiring the stub, coordinator and load generator together on ephemeral ports.

use mock_service::{Stub, StubConfig};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use surge::prelude::*;
use surge_coordinator::{
    server as coordinator_server, ConnectionPool, Coordinator, DownstreamConfig, PoolConfig,
    SqliteBackend,
};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("surge=debug,surge_coordinator=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub async fn spawn_stub(delay: Duration) -> SocketAddr {
    let stub = Stub::new(StubConfig { delay });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = stub.router();
    tokio::spawn(async move { axum::serve(listener, router).await });
    addr
}

/// A running coordinator backed by a throwaway SQLite database.
pub struct CoordinatorHandle {
    pub url: String,
    pub coordinator: Arc<Coordinator<SqliteBackend>>,
    _dir: TempDir,
}

impl CoordinatorHandle {
    pub async fn record_count(&self) -> i64 {
        self.coordinator
            .pool()
            .backend()
            .record_count()
            .await
            .unwrap()
    }
}

pub async fn spawn_coordinator(
    downstream: SocketAddr,
    max_connections: u32,
    downstream_timeout: Duration,
) -> CoordinatorHandle {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("surge.db").display());
    let pool_config = PoolConfig {
        min: 0,
        max: max_connections,
        ..PoolConfig::default()
    }
    .validate()
    .unwrap();

    let backend = SqliteBackend::connect(&url, &pool_config).await.unwrap();
    let coordinator = Arc::new(Coordinator::new(
        ConnectionPool::new(backend, pool_config.max),
        &DownstreamConfig {
            base_url: format!("http://{downstream}"),
            timeout: downstream_timeout,
        },
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(coordinator_server::serve(listener, coordinator.clone()));

    CoordinatorHandle {
        url: format!("http://{addr}"),
        coordinator,
        _dir: dir,
    }
}

pub fn generator(
    coordinator_url: &str,
    request_timeout: Duration,
) -> Arc<LoadGenerator<impl Fn() -> Call + Clone + Send + Sync + 'static>> {
    let target = coordinator_target(reqwest::Client::new(), coordinator_url);
    Arc::new(LoadGenerator::new(target).request_timeout(request_timeout))
}

pub async fn spawn_generator(coordinator_url: &str, request_timeout: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(surge::server::serve(
        listener,
        generator(coordinator_url, request_timeout),
    ));
    addr
}
