//! Dataset preparation and run coordination for plankton image classifiers.
/// Per-user application directories.
pub mod app_dirs;
/// Typed run configuration.
pub mod config;
/// Image source parsing, class balancing and train/test splitting.
pub mod dataset;
/// Tracing subscriber setup.
pub mod logging;
/// Host-wide exclusive run lock.
pub mod run_lock;
/// Training job preparation and backends.
pub mod training;
