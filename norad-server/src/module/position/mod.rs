//! Position resolution
//!
//! - `PositionResolver`: fetches the current position from the tracking
//!   service and classifies the sub-point as water or land
//! - `PositionSource`: the seam the stream publisher polls through

mod error;
pub use error::{ResolverError, Service};

mod geocode;

mod resolver;
pub use resolver::{PositionResolver, PositionSource};
