/// Operational fault channel, e.g. a driver-station error log.
pub trait FaultReporter: Send + Sync {
    fn report_error(&self, message: &str);
}

/// Reports faults as `tracing` errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FaultReporter for TracingReporter {
    fn report_error(&self, message: &str) {
        tracing::error!(target: "urcl::fault", "{message}");
    }
}
