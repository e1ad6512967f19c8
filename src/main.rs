//! Request audit server.
//!
//! ```text
//!     Client ──▶ TraceLayer ──▶ AuditLayer ──▶ Timeout ──▶ app / admin routes
//!                                   │
//!                                   ▼
//!                          RequestInterceptor
//!                   (retention buffer + rate limiter)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_audit::config::watcher::ConfigWatcher;
use request_audit::config::{load_config, AuditConfig};
use request_audit::lifecycle::{wait_for_signal, Shutdown};
use request_audit::observability::{logging, metrics};
use request_audit::HttpServer;

#[derive(Parser)]
#[command(name = "audit-server")]
#[command(about = "HTTP server with request auditing and per-client rate limiting", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "AUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Watch the config file and apply rate-limit changes live
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AuditConfig::default(),
    };

    logging::init_tracing(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "audit-server starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        capacity = config.retention.capacity,
        ttl_ms = config.retention.ttl_ms,
        window_ms = config.rate_limit.window_ms,
        max_requests = config.rate_limit.max_requests,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(config)?;
    let interceptor = server.interceptor();
    let shutdown = Shutdown::new();

    // Dropping the watcher stops notifications, so it lives until main returns.
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let mut stop = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(new_config) = updates.recv() => {
                            if let Err(e) = interceptor.apply_reload(&new_config) {
                                tracing::error!(error = %e, "Rejected reloaded configuration");
                            }
                        }
                        _ = stop.recv() => break,
                        else => break,
                    }
                }
            });
            Some(watcher)
        }
        (None, true) => {
            tracing::warn!("--watch ignored: no config file given");
            None
        }
        _ => None,
    };

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
