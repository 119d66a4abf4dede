//! Reverse-geocoding response handling

use norad_common::WATER_CATEGORY;
use serde::Deserialize;

use super::error::ResolverError;

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    components: Components,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    #[serde(rename = "_category")]
    category: Option<String>,
}

impl GeocodeResponse {
    /// Category of the best (first) match, if the geocoder returned one
    pub(crate) fn category(&self) -> Option<&str> {
        self.results.first()?.components.category.as_deref()
    }

    /// Whether the best match lies over water.
    ///
    /// The comparison is exact and case-sensitive. A response without a
    /// usable category is an error, never a default classification.
    pub(crate) fn above_water(&self, latitude: f64, longitude: f64) -> Result<bool, ResolverError> {
        self.category()
            .map(|category| category == WATER_CATEGORY)
            .ok_or(ResolverError::ClassificationAmbiguous { latitude, longitude })
    }
}
