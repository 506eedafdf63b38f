//! Development tools for Tetra.
//!
//! Logging initialisation for binaries and tests, plus resident-memory and
//! wall-clock instrumentation of the model pipeline stages.

pub mod logging;
pub mod measure;
pub mod memory;

pub use logging::{LogFormat, LogOptions, LoggingError, init_logging};
pub use measure::{MeasurementRecorder, StageMeasurement, StageToken};
pub use memory::{MemoryError, MemoryTracker, MemorySnapshot, capture_rss_bytes, rss_delta};
