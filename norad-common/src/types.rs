use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Geocoder category marking a coordinate over open water
pub const WATER_CATEGORY: &str = "natural/water";

/// Current position of the tracked object as reported by the tracking service.
///
/// Only the coordinates are interpreted. Every other upstream field
/// (altitude, velocity, visibility, timestamp, ...) is carried through
/// unchanged so responses mirror what the tracking service returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            extra: Map::new(),
        }
    }

    /// Altitude in kilometres, when the upstream reports one
    pub fn altitude(&self) -> Option<f64> {
        self.extra.get("altitude").and_then(Value::as_f64)
    }

    /// Orbital velocity, when the upstream reports one
    pub fn velocity(&self) -> Option<f64> {
        self.extra.get("velocity").and_then(Value::as_f64)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// A position enriched with its water/land classification.
///
/// Serializes flat: the upstream position fields plus `above_water`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    #[serde(flatten)]
    pub position: Position,
    pub above_water: bool,
}

impl Geolocation {
    pub fn new(mut position: Position, above_water: bool) -> Self {
        // An upstream field of the same name would be serialized twice
        position.extra.remove("above_water");
        Self {
            position,
            above_water,
        }
    }
}
