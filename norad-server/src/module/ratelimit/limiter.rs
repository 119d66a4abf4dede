use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::store::{CounterStore, CounterStoreError};

/// At most `times` requests per `window` for each client and route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub times: u64,
    pub window: Duration,
    /// Count clients by the first `X-Forwarded-For` hop. Only safe behind a
    /// proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Count a request for `key` against the policy
    pub async fn check(&self, key: &str) -> Result<Verdict, CounterStoreError> {
        let state = self.store.hit(key, self.policy.window).await?;
        if state.count > self.policy.times {
            Ok(Verdict::Limited {
                retry_after: state.reset_in,
            })
        } else {
            Ok(Verdict::Allowed)
        }
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Identity a request is counted against: the peer address, or the first
/// `X-Forwarded-For` hop when `trust_forwarded_for` is set.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    let forwarded = forwarded_for(headers).filter(|_| trust_forwarded_for);

    match (forwarded, peer) {
        (Some(forwarded), _) => forwarded.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

fn too_many_requests(retry_after: Duration) -> Response {
    let seconds = retry_after.as_millis().div_ceil(1000).max(1);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({ "detail": "Too Many Requests" })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

/// Middleware gating a route with `limiter`
pub async fn enforce(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), peer, limiter.policy().trust_forwarded_for);
    let key = format!("{}:{}", identity, request.uri().path());

    match limiter.check(&key).await {
        Ok(Verdict::Allowed) => next.run(request).await,
        Ok(Verdict::Limited { retry_after }) => {
            tracing::warn!("Rate limit exceeded for {}, retry in {:?}", key, retry_after);
            too_many_requests(retry_after)
        }
        Err(e) => {
            tracing::error!("Rate limit check failed for {}: {}", key, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}
