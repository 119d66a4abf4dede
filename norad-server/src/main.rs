use norad_server::config::ServerConfig;
use norad_server::module::position::PositionResolver;
use norad_server::module::ratelimit::{
    RateLimitPolicy, RateLimiter, counter_store, start_purge_task,
};
use norad_server::service::{AppState, build_router};

use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

const RATE_LIMIT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();
    let config = ServerConfig::load("config.toml")?;

    let _logging_guard =
        norad_server::logging::init_logging(&config.log_dir, "norad-server", &config.log_level)?;

    tracing::info!("NORAD-25544 position service starting...");
    if config.upstream.position_url.is_none() {
        tracing::warn!(
            "No tracking service configured; requests will fail until NORAD_POSITION_URL is set"
        );
    }

    let resolver = PositionResolver::new(config.upstream.clone())
        .context("Failed to build upstream HTTP client")?;

    let store = counter_store(&config.rate_limit).context("Invalid rate-limit store")?;
    start_purge_task(store.clone(), RATE_LIMIT_PURGE_INTERVAL);
    let limiter = RateLimiter::new(
        store,
        RateLimitPolicy {
            times: config.rate_limit.geolocation_times,
            window: config.rate_limit.geolocation_window(),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        },
    );
    if config.rate_limit.trust_forwarded_for {
        tracing::info!("Rate-limit clients identified by X-Forwarded-For");
    }
    tracing::info!(
        "Geolocation limited to {} request(s) per {}s",
        config.rate_limit.geolocation_times,
        config.rate_limit.geolocation_window_secs
    );

    let app = build_router(AppState::new(resolver, config.stream.clone()), limiter);

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    // Open streams never finish on their own, so Ctrl-C exits without draining
    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());
    tokio::select! {
        result = server.into_future() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutdown signal received.");
        }
    }

    Ok(())
}
