use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router, middleware};
use futures::{Stream, StreamExt};
use norad_common::Geolocation;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::StreamConfig;
use crate::module::position::{PositionResolver, ResolverError};
use crate::module::ratelimit::{RateLimiter, enforce};
use crate::module::stream::{PositionEvent, PositionPublisher, StreamError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<PositionResolver>,
    pub stream: StreamConfig,
}

impl AppState {
    pub fn new(resolver: PositionResolver, stream: StreamConfig) -> Self {
        Self {
            resolver: Arc::new(resolver),
            stream,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Seconds between events
    #[serde(rename = "dealy", alias = "delay")]
    pub delay: Option<u64>,
}

/// Current position plus water/land classification
async fn geolocation(State(state): State<AppState>) -> Result<Json<Geolocation>, ResolverError> {
    let geolocation = state.resolver.locate().await?;
    Ok(Json(geolocation))
}

/// Live position updates until the client disconnects
async fn position(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, StreamError>>> {
    let delay = params.delay.unwrap_or(state.stream.default_delay_secs);
    let publisher = PositionPublisher::new(
        state.resolver.clone(),
        Duration::from_secs(delay),
        state.stream.retry(),
    );
    let (rx, _handle) = publisher.spawn();

    let events = ReceiverStream::new(rx).map(|item| item.map(PositionEvent::into_sse));
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Build the application routes. `/v1/geolocation` is gated by `limiter`.
pub fn build_router(state: AppState, limiter: RateLimiter) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let limited = Router::new()
        .route("/v1/geolocation", get(geolocation))
        .route_layer(middleware::from_fn_with_state(limiter, enforce));

    Router::new()
        .route("/v1/position", get(position))
        .route("/health", get(health_check))
        .merge(limited)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
