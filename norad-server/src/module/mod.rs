pub mod position;
pub mod ratelimit;
pub mod stream;
