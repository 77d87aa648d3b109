use clap::Parser;
use latmetrics_server::config::{DEFAULT_ADDR, DEFAULT_DATA_FILE, DEFAULT_LOG_FILTER};
use latmetrics_server::dataset::{Dataset, LoadMode};
use latmetrics_server::loader::{FallbackSource, JsonFileSource, SampleSource};
use latmetrics_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "latmetrics-server", about = "Per-region latency and uptime metrics over a static dataset")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "LATMETRICS_ADDR", default_value = DEFAULT_ADDR)]
    addr: SocketAddr,

    /// Path to the JSON array of samples.
    #[arg(long, env = "LATMETRICS_DATA", default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Dataset to use when `--data` cannot be read.
    #[arg(long, env = "LATMETRICS_FALLBACK_DATA")]
    fallback_data: Option<PathBuf>,

    /// Read the dataset on every request instead of once at startup.
    #[arg(long, env = "LATMETRICS_PER_REQUEST")]
    per_request: bool,

    /// Re-read the dataset this often (seconds) and swap in the new snapshot.
    #[arg(long, env = "LATMETRICS_RELOAD_INTERVAL_SECS")]
    reload_interval_secs: Option<u64>,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let primary = JsonFileSource::new(&args.data);
    let source: Box<dyn SampleSource> = match args.fallback_data {
        Some(fallback) => Box::new(FallbackSource::new(Box::new(primary), Box::new(JsonFileSource::new(fallback)))),
        None => Box::new(primary),
    };

    let mode = if args.per_request { LoadMode::PerRequest } else { LoadMode::Startup };
    let dataset = Arc::new(Dataset::open(source, mode)?);

    let config = ServerConfig {
        address: args.addr,
        reload_interval: args.reload_interval_secs.filter(|&s| s > 0).map(Duration::from_secs),
    };

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Print "Listening on <addr>" once the server signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            println!("Listening on {}", addr);
        }
    });

    Server::new(config, dataset).run(ready_tx).await?;
    Ok(())
}
