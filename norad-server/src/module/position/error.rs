use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Upstream service a resolver error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Tracking,
    Geocoding,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Tracking => write!(f, "tracking service"),
            Service::Geocoding => write!(f, "geocoding service"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid {service} url: {url}")]
    InvalidUrl { service: Service, url: String },

    #[error("{service} unavailable: {source}")]
    Upstream {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}")]
    Status {
        service: Service,
        status: reqwest::StatusCode,
    },

    #[error("{service} returned a malformed body: {source}")]
    Malformed {
        service: Service,
        #[source]
        source: serde_json::Error,
    },

    #[error("no surface classification for ({latitude}, {longitude})")]
    ClassificationAmbiguous { latitude: f64, longitude: f64 },
}

/// Resolver failures are opaque to clients; the detail only goes to the log.
impl IntoResponse for ResolverError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": "Internal Server Error" })),
        )
            .into_response()
    }
}
