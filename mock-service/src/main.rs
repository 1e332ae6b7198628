use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::{Stub, StubConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(version, about = "Slow downstream dependency")]
struct Cli {
    #[arg(short, long, env = "PORT", default_value_t = 8082)]
    port: u16,

    /// How long every request sleeps before answering.
    #[arg(short, long, env = "DOWNSTREAM_DELAY", value_parser = humantime::parse_duration, default_value = "2s")]
    delay: Duration,

    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=info")),
        )
        .init();

    if let Some(port) = args.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()?;
    }

    let stub = Stub::new(StubConfig { delay: args.delay });
    tokio::spawn(stub.clone().throughput_task());

    mock_service::run(SocketAddr::from(([0, 0, 0, 0], args.port)), stub).await?;
    Ok(())
}
