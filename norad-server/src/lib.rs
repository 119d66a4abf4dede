//! HTTP service exposing the live position of NORAD-25544 (the ISS).
//!
//! - `GET /v1/geolocation`: current position plus water/land classification,
//!   rate limited per client
//! - `GET /v1/position`: server-sent position updates until disconnect

pub mod config;
pub mod logging;
pub mod module;
pub mod service;
