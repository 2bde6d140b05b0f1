// Common library shared by the notifier binary and the integration tests

pub mod config;
pub mod errors;
pub mod queue;
pub mod schedule;
pub mod table;
pub mod telemetry;
pub mod trigger;
