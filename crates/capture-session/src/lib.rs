//! capture-session: one-shot capture of motor-controller telemetry
//!
//! Starting a session claims the process-wide [`StartGuard`], encodes the alias
//! table, starts the capture driver and either registers a 50 Hz tick that
//! pushes every refresh to a sink, or returns a [`PullAccessor`] for an
//! external scheduler. Starting a second time reports a fault and returns an
//! inert result.

mod error;
pub use error::{Result, SessionError};

pub mod alias;
pub use alias::{load_alias_file, AliasTable, BusAliases};

mod config;
pub use config::{SessionConfig, DEFAULT_PERIOD_MS};

mod fault;
pub use fault::{FaultReporter, TracingReporter};

mod metrics;
pub use metrics::SessionMetrics;

mod ticker;
pub use ticker::Ticker;

mod session;
pub use session::{
    CaptureSession, Destination, OwnedSnapshot, PullAccessor, Snapshot, StartGuard,
};

use capture_driver::CaptureDriver;
use telemetry_sink::{DataLog, TopicTable};

static PROCESS_GUARD: StartGuard = StartGuard::new();

/// The guard shared by the free `start*` functions.
pub fn process_guard() -> &'static StartGuard {
    &PROCESS_GUARD
}

/// Capture to live topics. Only the first start in a process takes effect.
pub fn start<D: CaptureDriver + 'static>(
    driver: D,
    topics: &dyn TopicTable,
) -> Result<CaptureSession> {
    PROCESS_GUARD.start(driver, topics)
}

pub fn start_with_aliases<D: CaptureDriver + 'static>(
    driver: D,
    aliases: &AliasTable,
    topics: &dyn TopicTable,
) -> Result<CaptureSession> {
    PROCESS_GUARD.start_with_aliases(driver, aliases, topics)
}

/// Capture to a data log. Only the first start in a process takes effect.
pub fn start_log<D: CaptureDriver + 'static>(
    driver: D,
    log: &dyn DataLog,
) -> Result<CaptureSession> {
    PROCESS_GUARD.start_log(driver, log)
}

pub fn start_log_with_aliases<D: CaptureDriver + 'static>(
    driver: D,
    aliases: &AliasTable,
    log: &dyn DataLog,
) -> Result<CaptureSession> {
    PROCESS_GUARD.start_log_with_aliases(driver, aliases, log)
}

/// Capture for an external scheduler. Only the first start in a process
/// takes effect; later calls get an accessor that yields empty payloads.
pub fn start_external<D: CaptureDriver + 'static>(driver: D) -> Result<PullAccessor> {
    PROCESS_GUARD.start_external(driver)
}

pub fn start_external_with_aliases<D: CaptureDriver + 'static>(
    driver: D,
    aliases: &AliasTable,
) -> Result<PullAccessor> {
    PROCESS_GUARD.start_external_with_aliases(driver, aliases)
}
