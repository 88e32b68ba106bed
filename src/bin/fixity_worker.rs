//! Fixity Worker Binary
//!
//! Runs one crawl worker against a provenance catalog and content store.
//! Start as many workers as needed; they coordinate through the lock servers.
//!
//! ## Configuration
//!
//! Flags, each with an environment fallback:
//! - `--catalog-url` / `FIXITY_CATALOG_URL`: provenance catalog base URL (required)
//! - `--content-url` / `FIXITY_CONTENT_URL`: content store base URL (required)
//! - `--locking-server` / `FIXITY_LOCK_SERVERS`: lock server address, repeatable or comma separated (required)
//! - `--delay-ms` / `FIXITY_DELAY_MS`: pause before each object (default: 100)
//! - `--pass-interval-ms` / `FIXITY_PASS_INTERVAL_MS`: pause after a completed pass (default: the item delay)
//! - `--restart-backoff-secs` / `FIXITY_RESTART_BACKOFF_SECS`: pause after an aborted pass (default: 5)
//! - `--max-age-secs` / `FIXITY_MAX_AGE_SECS`: only audit objects not checked within this window (default: audit everything)
//! - `--lock-ttl-ms` / `FIXITY_LOCK_TTL_MS`: lease TTL (default: 100000)
//! - `--lock-quorum` / `FIXITY_LOCK_QUORUM`: replicas required for a lease (default: majority)
//! - `--algorithm` / `FIXITY_ALGORITHM`: `md5` or `sha256` (default: md5)
//! - `--failure-policy` / `FIXITY_FAILURE_POLICY`: `abort-pass` or `skip-item` (default: abort-pass)
//! - `RUST_LOG`: log level filter (default: fixity_worker=info,fixity_spider=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! fixity_worker --catalog-url http://catalog:8910 --content-url http://content:8911 \
//!     --locking-server redis-a:6379 --locking-server redis-b:6379 --locking-server redis-c:6379
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fixity_spider::{
    AcceptAll, CrawlFilter, Crawler, CrawlerConfig, FailurePolicy, FixityAlgorithm, FixityAuditor,
    HttpCatalog, HttpCatalogConfig, HttpContentConfig, HttpContentStore, LockReplica, QuorumConfig,
    QuorumMutex, RedisLockReplica, StalenessFilter, TracingMetrics,
};

/// Fixity worker CLI
#[derive(Parser, Debug)]
#[command(name = "fixity_worker")]
#[command(about = "Crawls a provenance catalog and records fixity checks", long_about = None)]
#[command(version)]
struct Cli {
    /// Provenance catalog base URL
    #[arg(long, env = "FIXITY_CATALOG_URL")]
    catalog_url: String,

    /// Content store base URL
    #[arg(long, env = "FIXITY_CONTENT_URL")]
    content_url: String,

    /// Lock server address
    #[arg(
        long = "locking-server",
        env = "FIXITY_LOCK_SERVERS",
        value_delimiter = ',',
        required = true
    )]
    locking_servers: Vec<String>,

    /// Pause before each object, in milliseconds
    #[arg(long, env = "FIXITY_DELAY_MS", default_value_t = 100)]
    delay_ms: u64,

    /// Pause after a completed pass, in milliseconds (defaults to the item delay)
    #[arg(long, env = "FIXITY_PASS_INTERVAL_MS")]
    pass_interval_ms: Option<u64>,

    /// Pause after an aborted pass, in seconds
    #[arg(long, env = "FIXITY_RESTART_BACKOFF_SECS", default_value_t = 5)]
    restart_backoff_secs: u64,

    /// Skip objects checked within this many seconds
    #[arg(long, env = "FIXITY_MAX_AGE_SECS")]
    max_age_secs: Option<u64>,

    /// Lease TTL, in milliseconds
    #[arg(long, env = "FIXITY_LOCK_TTL_MS", default_value_t = 100_000)]
    lock_ttl_ms: u64,

    /// Replicas required for a lease
    #[arg(long, env = "FIXITY_LOCK_QUORUM")]
    lock_quorum: Option<usize>,

    /// Digest algorithm to verify
    #[arg(long, env = "FIXITY_ALGORITHM", default_value = "md5")]
    algorithm: FixityAlgorithm,

    /// Item failure handling
    #[arg(long, env = "FIXITY_FAILURE_POLICY", default_value = "abort-pass")]
    failure_policy: FailurePolicy,
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fixity_worker=info,fixity_spider=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        catalog = %cli.catalog_url,
        content = %cli.content_url,
        lock_servers = cli.locking_servers.len(),
        algorithm = %cli.algorithm,
        "Starting fixity worker"
    );

    let catalog = Arc::new(HttpCatalog::new(HttpCatalogConfig::new(&cli.catalog_url))?);
    let content = Arc::new(HttpContentStore::new(HttpContentConfig::new(&cli.content_url))?);

    let mut replicas: Vec<Arc<dyn LockReplica>> = Vec::with_capacity(cli.locking_servers.len());
    for address in &cli.locking_servers {
        replicas.push(Arc::new(RedisLockReplica::open(address)?));
    }

    let mut quorum_config = QuorumConfig::default().with_ttl(Duration::from_millis(cli.lock_ttl_ms));
    if let Some(quorum) = cli.lock_quorum {
        quorum_config = quorum_config.with_quorum(quorum);
    }
    let mutex = Arc::new(QuorumMutex::new(replicas, quorum_config)?);

    let metrics = Arc::new(TracingMetrics);

    let filter: Arc<dyn CrawlFilter> = match cli.max_age_secs {
        Some(secs) => {
            info!(max_age_secs = secs, "Auditing stale objects only");
            Arc::new(
                StalenessFilter::new(Arc::clone(&catalog), Duration::from_secs(secs))
                    .with_metrics(metrics.clone()),
            )
        }
        None => Arc::new(AcceptAll),
    };

    let auditor = FixityAuditor::new(Arc::clone(&catalog), content)
        .with_algorithm(cli.algorithm)
        .with_metrics(metrics.clone());

    let config = CrawlerConfig::default()
        .with_item_delay(Duration::from_millis(cli.delay_ms))
        .with_pass_interval(Duration::from_millis(cli.pass_interval_ms.unwrap_or(cli.delay_ms)))
        .with_restart_backoff(Duration::from_secs(cli.restart_backoff_secs))
        .with_failure_policy(cli.failure_policy);

    let crawler = Crawler::new(catalog, mutex, filter, Arc::new(auditor), config).with_metrics(metrics);

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
            _ = terminate => info!("Received SIGTERM, shutting down"),
        }
    };

    tokio::select! {
        _ = crawler.crawl() => {}
        _ = shutdown_signal => {}
    }

    info!("Fixity worker stopped");
    Ok(())
}
