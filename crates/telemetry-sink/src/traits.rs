use crate::{Payloads, Result, SinkKind};

/// A raw topic publisher with overwrite semantics.
pub trait RawPublisher: Send {
    fn set(&mut self, payload: &[u8]) -> Result<()>;
}

/// A raw data-log entry.
pub trait RawLogEntry: Send {
    /// Record a new immutable value.
    fn append(&mut self, payload: &[u8]) -> Result<()>;

    /// Record `payload` only if it differs from the last value of this entry,
    /// so the latest record is always the current snapshot.
    fn update(&mut self, payload: &[u8]) -> Result<()>;
}

/// Source of raw publishers, e.g. a NetworkTables instance.
pub trait TopicTable {
    fn raw_publisher(&self, name: &str, type_string: &str) -> Result<Box<dyn RawPublisher>>;
}

/// Source of raw log entries, e.g. a DataLog file.
pub trait DataLog {
    fn raw_entry(&self, name: &str, type_string: &str) -> Result<Box<dyn RawLogEntry>>;
}

/// Destination for the payloads of each refresh.
pub trait TelemetrySink: Send {
    fn kind(&self) -> SinkKind;

    /// Deliver one refresh worth of payloads. Errors are returned to the caller
    /// untouched; sinks do not retry.
    fn deliver(&mut self, payloads: &Payloads<'_>) -> Result<()>;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn kind(&self) -> SinkKind {
        (**self).kind()
    }

    fn deliver(&mut self, payloads: &Payloads<'_>) -> Result<()> {
        (**self).deliver(payloads)
    }
}
