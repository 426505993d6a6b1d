//! HTTP API handlers for tilawa-ra

pub mod analyze;
pub mod health;
pub mod matching;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use matching::match_routes;
