//! Shared data types for the NORAD-25544 position service.

pub mod types;

pub use types::{Geolocation, Position, WATER_CATEGORY};
