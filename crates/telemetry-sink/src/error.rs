use thiserror::Error;

pub type Result<T, E = SinkError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("encoding error: {0}")]
    Encode(String),
    #[error("sink closed: {0}")]
    Closed(String),
    #[error("sink state lock poisoned")]
    Poisoned,
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::Io(e.to_string())
    }
}
