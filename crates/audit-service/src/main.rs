use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use audit_service::cache::{spawn_cleanup_sweep, CredentialCache};
use audit_service::config::Config;
use audit_service::{routes, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().map_err(|e| {
        eprintln!("failed to load configuration: {e}");
        e
    })?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("audit_service={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting audit history service");

    let cache = CredentialCache::new(config.cache_jwt_ttl, config.cache_share_token_ttl);
    let _sweep_handle = spawn_cleanup_sweep(cache.clone(), config.cache_cleanup_interval);

    let state = Arc::new(AppState::build(&config, cache).map_err(|e| {
        error!("failed to build application state: {e}");
        e
    })?);

    let port = config.port;
    let app = routes::build_routes(state, config.http_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "audit history service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("audit history service shutdown complete");

    Ok(())
}

/// Waits for SIGINT or SIGTERM, then drains for `DRAIN_SECONDS` (default 30) before
/// returning, allowing in-flight requests to complete and the orchestrator's readiness
/// probe to observe the process leaving the load-balancing pool.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received SIGINT, starting graceful shutdown"),
            Err(e) => error!("failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM, starting graceful shutdown");
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    if drain_secs > 0 {
        warn!("draining connections for {} seconds", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
    }
}
