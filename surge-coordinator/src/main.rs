use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use surge_coordinator::config::CoordinatorCli;
use surge_coordinator::{server, ConnectionPool, Coordinator, SqliteBackend};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CoordinatorCli::parse();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("surge_coordinator=info,tower_http=info")),
        )
        .init();

    if let Some(port) = args.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()?;
    }

    let pool_config = args.pool_config()?;
    let downstream = args.downstream_config();
    info!(
        "Pool min={} max={} lifetime={} idle={}; downstream {} (timeout {})",
        pool_config.min,
        pool_config.max,
        humantime::format_duration(pool_config.max_lifetime),
        humantime::format_duration(pool_config.idle_timeout),
        downstream.base_url,
        humantime::format_duration(downstream.timeout),
    );

    let backend = SqliteBackend::connect(&args.database_url, &pool_config).await?;
    let coordinator = Arc::new(Coordinator::new(
        ConnectionPool::new(backend, pool_config.max),
        &downstream,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::serve(listener, coordinator).await?;
    Ok(())
}
