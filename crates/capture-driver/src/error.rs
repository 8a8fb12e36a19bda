use thiserror::Error;

pub type Result<T, E = DriverError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver not started")]
    NotStarted,
    #[error("driver unavailable: {0}")]
    Unavailable(String),
    #[error("operation not supported by this driver: {0}")]
    Unsupported(&'static str),
    #[error("invalid record: {0}")]
    InvalidRecord(&'static str),
    #[error("driver state lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Region(#[from] RegionError),
}

/// Framing faults on a shared region.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("region too small for length prefix: capacity {capacity}")]
    TooSmall { capacity: usize },
    #[error("declared length {declared} exceeds region payload capacity {max}")]
    LengthOutOfRange { declared: usize, max: usize },
    #[error("region lock poisoned")]
    Poisoned,
}
