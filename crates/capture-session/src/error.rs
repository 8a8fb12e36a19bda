use capture_driver::{DriverError, RegionError};
use telemetry_sink::SinkError;
use thiserror::Error;

pub type Result<T, E = SessionError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
    #[error("consistency fault: {0}")]
    Region(#[from] RegionError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("alias encoding failed: {0}")]
    Alias(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("metrics error: {0}")]
    Metrics(String),
    #[error("ticker error: {0}")]
    Ticker(String),
}

impl SessionError {
    /// Whether the periodic tick must stop after this error.
    ///
    /// Sink failures end only the tick that raised them. Driver and region
    /// faults mean the shared regions can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Sink(_))
    }
}
