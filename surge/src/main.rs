use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use surge::prelude::*;
use surge::server;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(version, about = "Load generator for the transaction coordinator")]
struct Cli {
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    #[arg(long, env = "COORDINATOR_URL", default_value = "http://127.0.0.1:8081")]
    coordinator_url: String,

    /// Timeout for each individual call into the coordinator.
    #[arg(long, env = "REQUEST_TIMEOUT", value_parser = humantime::parse_duration, default_value = "10s")]
    request_timeout: Duration,

    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("surge=info,tower_http=info")),
        )
        .init();

    if let Some(port) = args.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()?;
    }

    info!(
        "Targeting {} with a {} per-call timeout",
        args.coordinator_url,
        humantime::format_duration(args.request_timeout)
    );
    let target = coordinator_target(reqwest::Client::new(), &args.coordinator_url);
    let generator = Arc::new(LoadGenerator::new(target).request_timeout(args.request_timeout));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::serve(listener, generator).await?;
    Ok(())
}
