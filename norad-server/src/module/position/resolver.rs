//! Position resolver: tracking-service fetch plus water/land classification

use async_trait::async_trait;
use norad_common::{Geolocation, Position};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use super::error::{ResolverError, Service};
use super::geocode::GeocodeResponse;
use crate::config::UpstreamConfig;

/// Anything that can report the current position of the tracked object
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn fetch_position(&self) -> Result<Position, ResolverError>;
}

/// Stateless client for the tracking and reverse-geocoding services.
///
/// Holds a pooled async HTTP client; cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct PositionResolver {
    client: Client,
    upstream: UpstreamConfig,
}

impl PositionResolver {
    pub fn new(upstream: UpstreamConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(upstream.timeout())
            .user_agent(concat!("norad-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, upstream })
    }

    fn position_url(&self) -> Result<Url, ResolverError> {
        let url = self
            .upstream
            .position_url
            .as_deref()
            .ok_or(ResolverError::MissingConfig("position_url"))?;

        Url::parse(url).map_err(|_| ResolverError::InvalidUrl {
            service: Service::Tracking,
            url: url.to_string(),
        })
    }

    fn geocode_url(&self, latitude: f64, longitude: f64) -> Result<Url, ResolverError> {
        let url = self
            .upstream
            .geocode_url
            .as_deref()
            .ok_or(ResolverError::MissingConfig("geocode_url"))?;
        let key = self
            .upstream
            .geocode_key
            .as_deref()
            .ok_or(ResolverError::MissingConfig("geocode_key"))?;

        let query = format!("{} {}", latitude, longitude);
        Url::parse_with_params(url, &[("q", query.as_str()), ("key", key)]).map_err(|_| {
            ResolverError::InvalidUrl {
                service: Service::Geocoding,
                url: url.to_string(),
            }
        })
    }

    /// GET `url` and decode the JSON body. No retries.
    async fn get_json<T: DeserializeOwned>(
        &self,
        service: Service,
        url: Url,
    ) -> Result<T, ResolverError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ResolverError::Upstream { service, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::Status { service, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ResolverError::Upstream { service, source })?;

        serde_json::from_slice(&body).map_err(|source| ResolverError::Malformed { service, source })
    }

    /// Current position and velocity of the tracked object
    pub async fn fetch_position(&self) -> Result<Position, ResolverError> {
        let url = self.position_url()?;
        let position: Position = self.get_json(Service::Tracking, url).await?;
        tracing::debug!("Fetched position {}", position);
        Ok(position)
    }

    /// Whether the coordinate lies over water according to the geocoder
    pub async fn classify_surface(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<bool, ResolverError> {
        let url = self.geocode_url(latitude, longitude)?;
        let response: GeocodeResponse = self.get_json(Service::Geocoding, url).await?;
        let above_water = response.above_water(latitude, longitude)?;
        tracing::debug!(
            "Surface at ({}, {}) is {:?}, above_water={}",
            latitude,
            longitude,
            response.category(),
            above_water
        );
        Ok(above_water)
    }

    /// Fetch the position and classify the point beneath it
    pub async fn locate(&self) -> Result<Geolocation, ResolverError> {
        let position = self.fetch_position().await?;
        let above_water = self
            .classify_surface(position.latitude, position.longitude)
            .await?;
        Ok(Geolocation::new(position, above_water))
    }
}

#[async_trait]
impl PositionSource for PositionResolver {
    async fn fetch_position(&self) -> Result<Position, ResolverError> {
        PositionResolver::fetch_position(self).await
    }
}
