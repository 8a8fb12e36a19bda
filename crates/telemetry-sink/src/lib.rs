//! telemetry-sink: destinations for captured motor-controller telemetry
//!
//! A sink receives the persistent snapshot, the periodic batch and the alias
//! table after every refresh. [`LiveTopicSink`] republishes all three with
//! overwrite semantics; [`LogEntrySink`] keeps a data log where the snapshot is
//! updated, the batch appended, and the aliases written once.

mod types;
pub use types::{Payloads, SinkKind, SinkTopics, TopicSpec};

mod error;
pub use error::{Result, SinkError};

mod traits;
pub use traits::{DataLog, RawLogEntry, RawPublisher, TelemetrySink, TopicTable};

mod live;
pub use live::LiveTopicSink;

mod log;
pub use log::LogEntrySink;

mod memory;
pub use memory::{MemoryLog, MemoryTopics};

#[cfg(feature = "jsonl")]
mod jsonl;
#[cfg(feature = "jsonl")]
pub use jsonl::{read_records, JsonLinesLog, LogRecord};
