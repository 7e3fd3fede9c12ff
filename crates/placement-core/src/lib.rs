pub mod config;
pub mod error;
pub mod placements;
pub mod telemetry;
