use crate::{
    AliasTable, FaultReporter, Result, SessionConfig, SessionError, SessionMetrics, Ticker,
    TracingReporter,
};
use capture_driver::{CaptureDriver, FrameRegion, FrameView, RegionError};
use std::sync::atomic::{AtomicBool, Ordering};
use telemetry_sink::{
    DataLog, LiveTopicSink, LogEntrySink, Payloads, SinkKind, TelemetrySink, TopicTable,
};
use tracing::{debug, error, info};

const DOUBLE_START_MESSAGE: &str = "URCL cannot be started multiple times";

/// Where a push session sends its payloads.
pub enum Destination<'a> {
    LiveTopic(&'a dyn TopicTable),
    LogEntry(&'a dyn DataLog),
    Custom(Box<dyn TelemetrySink>),
}

/// One-shot start guard.
///
/// The first `start*` call claims the guard and builds a session; every later
/// call reports a fault and returns an inert result. The guard is never
/// released, so a failed start cannot initialize the driver twice.
pub struct StartGuard {
    running: AtomicBool,
    reporter: Option<Box<dyn FaultReporter>>,
}

impl Default for StartGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl StartGuard {
    /// A guard that reports faults through `tracing`.
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            reporter: None,
        }
    }

    pub fn with_reporter(reporter: impl FaultReporter + 'static) -> Self {
        Self {
            running: AtomicBool::new(false),
            reporter: Some(Box::new(reporter)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return true;
        }
        match &self.reporter {
            Some(reporter) => reporter.report_error(DOUBLE_START_MESSAGE),
            None => TracingReporter.report_error(DOUBLE_START_MESSAGE),
        }
        false
    }

    /// Publish to live topics with no aliases.
    pub fn start<D>(&self, driver: D, topics: &dyn TopicTable) -> Result<CaptureSession>
    where
        D: CaptureDriver + 'static,
    {
        self.start_with_aliases(driver, &AliasTable::new(), topics)
    }

    /// Publish to live topics.
    pub fn start_with_aliases<D>(
        &self,
        driver: D,
        aliases: &AliasTable,
        topics: &dyn TopicTable,
    ) -> Result<CaptureSession>
    where
        D: CaptureDriver + 'static,
    {
        self.start_with_config(
            driver,
            aliases,
            Destination::LiveTopic(topics),
            &SessionConfig::default(),
        )
    }

    /// Write to a data log with no aliases.
    pub fn start_log<D>(&self, driver: D, log: &dyn DataLog) -> Result<CaptureSession>
    where
        D: CaptureDriver + 'static,
    {
        self.start_log_with_aliases(driver, &AliasTable::new(), log)
    }

    /// Write to a data log.
    pub fn start_log_with_aliases<D>(
        &self,
        driver: D,
        aliases: &AliasTable,
        log: &dyn DataLog,
    ) -> Result<CaptureSession>
    where
        D: CaptureDriver + 'static,
    {
        self.start_with_config(
            driver,
            aliases,
            Destination::LogEntry(log),
            &SessionConfig::default(),
        )
    }

    /// Start a push session with explicit configuration.
    pub fn start_with_config<D>(
        &self,
        driver: D,
        aliases: &AliasTable,
        destination: Destination<'_>,
        config: &SessionConfig,
    ) -> Result<CaptureSession>
    where
        D: CaptureDriver + 'static,
    {
        if !self.claim() {
            let kind = match &destination {
                Destination::LiveTopic(_) => SinkKind::LiveTopic,
                Destination::LogEntry(_) => SinkKind::LogEntry,
                Destination::Custom(sink) => sink.kind(),
            };
            return Ok(CaptureSession::inert(kind, SessionMetrics::new()?));
        }
        config.validate()?;
        let metrics = SessionMetrics::new()?;
        let mut capture = Capture::open(Box::new(driver), aliases, metrics.clone())?;

        let mut sink: Box<dyn TelemetrySink> = match destination {
            Destination::LiveTopic(table) => Box::new(LiveTopicSink::new(table, &config.topics)?),
            Destination::LogEntry(log) => {
                let mut sink = LogEntrySink::new(log, &config.topics)?;
                sink.write_aliases(&capture.aliases)?;
                Box::new(sink)
            }
            Destination::Custom(sink) => sink,
        };
        let kind = sink.kind();

        let ticker = Ticker::spawn(&config.thread_name, config.period(), move || {
            capture.tick(sink.as_mut())
        })?;
        info!(sink = %kind, period_ms = config.period_ms, "capture session started");
        Ok(CaptureSession {
            sink: kind,
            metrics,
            ticker: Some(ticker),
        })
    }

    /// Hand refreshes to an external scheduler with no aliases.
    pub fn start_external<D>(&self, driver: D) -> Result<PullAccessor>
    where
        D: CaptureDriver + 'static,
    {
        self.start_external_with_aliases(driver, &AliasTable::new())
    }

    /// Hand refreshes to an external scheduler. No tick is registered; the
    /// caller decides when to [`PullAccessor::pull`].
    pub fn start_external_with_aliases<D>(
        &self,
        driver: D,
        aliases: &AliasTable,
    ) -> Result<PullAccessor>
    where
        D: CaptureDriver + 'static,
    {
        if !self.claim() {
            return Ok(PullAccessor {
                capture: None,
                metrics: SessionMetrics::new()?,
            });
        }
        let metrics = SessionMetrics::new()?;
        let capture = Capture::open(Box::new(driver), aliases, metrics.clone())?;
        info!(sink = %SinkKind::ExternalPull, "capture session started");
        Ok(PullAccessor {
            capture: Some(capture),
            metrics,
        })
    }
}

/// Driver, regions and alias bytes owned by a running session.
struct Capture {
    driver: Box<dyn CaptureDriver>,
    persistent: FrameRegion,
    periodic: FrameRegion,
    aliases: Vec<u8>,
    metrics: SessionMetrics,
}

impl Capture {
    fn open(
        mut driver: Box<dyn CaptureDriver>,
        aliases: &AliasTable,
        metrics: SessionMetrics,
    ) -> Result<Self> {
        let aliases = aliases.encode()?;
        driver.start()?;
        let persistent = driver.persistent_buffer()?;
        let periodic = driver.periodic_buffer()?;
        debug!(
            driver = driver.name(),
            persistent_capacity = persistent.capacity(),
            periodic_capacity = periodic.capacity(),
            alias_bytes = aliases.len(),
            "driver regions acquired"
        );
        Ok(Self {
            driver,
            persistent,
            periodic,
            aliases,
            metrics,
        })
    }

    /// Views of the current payloads. Call after a driver refresh.
    fn read(&self) -> Result<Snapshot<'_>> {
        let persistent = self.persistent.view().map_err(|e| self.fault(e))?;
        let periodic = self.periodic.view().map_err(|e| self.fault(e))?;
        self.metrics.refreshes.inc();
        self.metrics.persistent_bytes.set(persistent.len() as i64);
        self.metrics.periodic_bytes.inc_by(periodic.len() as u64);
        Ok(Snapshot {
            persistent,
            periodic,
            aliases: &self.aliases,
        })
    }

    fn fault(&self, e: RegionError) -> SessionError {
        self.metrics.region_faults.inc();
        error!(driver = self.driver.name(), error = %e, "region consistency fault");
        e.into()
    }

    fn tick(&mut self, sink: &mut dyn TelemetrySink) -> Result<()> {
        self.driver.refresh()?;
        let snapshot = self.read()?;
        match sink.deliver(&snapshot.payloads()) {
            Ok(()) => {
                self.metrics.deliveries.inc();
                Ok(())
            }
            Err(e) => {
                self.metrics.sink_failures.inc();
                Err(e.into())
            }
        }
    }
}

/// Payload views from one refresh.
///
/// The views keep the driver from rewriting its regions until dropped.
#[derive(Debug)]
pub struct Snapshot<'a> {
    pub persistent: FrameView<'a>,
    pub periodic: FrameView<'a>,
    pub aliases: &'a [u8],
}

impl Snapshot<'_> {
    pub fn empty() -> Self {
        Snapshot {
            persistent: FrameView::empty(),
            periodic: FrameView::empty(),
            aliases: &[],
        }
    }

    pub fn payloads(&self) -> Payloads<'_> {
        Payloads {
            persistent: &self.persistent,
            periodic: &self.periodic,
            aliases: self.aliases,
        }
    }

    pub fn to_owned_snapshot(&self) -> OwnedSnapshot {
        OwnedSnapshot {
            persistent: self.persistent.to_vec(),
            periodic: self.periodic.to_vec(),
            aliases: self.aliases.to_vec(),
        }
    }
}

/// Copied payloads, detached from the driver regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedSnapshot {
    pub persistent: Vec<u8>,
    pub periodic: Vec<u8>,
    pub aliases: Vec<u8>,
}

/// Pull-mode accessor returned by `start_external*`.
///
/// Each [`pull`](PullAccessor::pull) refreshes the driver on the caller's
/// thread. An accessor from a repeated start always yields empty payloads.
pub struct PullAccessor {
    capture: Option<Capture>,
    metrics: SessionMetrics,
}

impl PullAccessor {
    pub fn pull(&mut self) -> Result<Snapshot<'_>> {
        match self.capture.as_mut() {
            Some(capture) => {
                capture.driver.refresh()?;
                capture.read()
            }
            None => Ok(Snapshot::empty()),
        }
    }

    pub fn pull_owned(&mut self) -> Result<OwnedSnapshot> {
        Ok(self.pull()?.to_owned_snapshot())
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }
}

/// Handle to a push session.
///
/// The tick runs for the rest of the process; dropping the handle leaves it
/// running. Only [`stop`](CaptureSession::stop) ends it.
pub struct CaptureSession {
    sink: SinkKind,
    metrics: SessionMetrics,
    ticker: Option<Ticker>,
}

impl CaptureSession {
    /// Same shape as a running session, so a repeated start is only visible
    /// through the fault report.
    fn inert(sink: SinkKind, metrics: SessionMetrics) -> Self {
        Self {
            sink,
            metrics,
            ticker: None,
        }
    }

    pub fn sink_kind(&self) -> SinkKind {
        self.sink
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// True once the tick has ended on a fatal error.
    pub fn is_finished(&self) -> bool {
        self.ticker.as_ref().map(Ticker::is_finished).unwrap_or(false)
    }

    /// Stop ticking. Returns the number of ticks run, or the fault that ended
    /// the tick early.
    pub fn stop(mut self) -> Result<u64> {
        match self.ticker.take() {
            Some(ticker) => ticker.stop(),
            None => Ok(0),
        }
    }

}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            debug!(ticker = ticker.name(), "session handle dropped, capture continues");
            ticker.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BusAliases;
    use capture_driver::{records, DriverError, SimDriver};
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use telemetry_sink::{MemoryLog, MemoryTopics, SinkError, SinkTopics};

    #[derive(Clone, Default)]
    struct CountingReporter(Arc<AtomicU32>);

    impl FaultReporter for CountingReporter {
        fn report_error(&self, message: &str) {
            assert_eq!(message, DOUBLE_START_MESSAGE);
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Driver with fixed region contents.
    struct FixedDriver {
        persistent: FrameRegion,
        periodic: FrameRegion,
        starts: Arc<AtomicU32>,
        fail_start: bool,
    }

    impl FixedDriver {
        fn new(persistent: FrameRegion, periodic: FrameRegion) -> Self {
            Self {
                persistent,
                periodic,
                starts: Arc::default(),
                fail_start: false,
            }
        }
    }

    impl CaptureDriver for FixedDriver {
        fn start(&mut self) -> capture_driver::Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(DriverError::Unavailable("no hardware".into()));
            }
            Ok(())
        }

        fn persistent_buffer(&self) -> capture_driver::Result<FrameRegion> {
            Ok(self.persistent.clone())
        }

        fn periodic_buffer(&self) -> capture_driver::Result<FrameRegion> {
            Ok(self.periodic.clone())
        }

        fn refresh(&mut self) -> capture_driver::Result<()> {
            Ok(())
        }
    }

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn kind(&self) -> SinkKind {
            SinkKind::LiveTopic
        }

        fn deliver(&mut self, _payloads: &Payloads<'_>) -> telemetry_sink::Result<()> {
            Err(SinkError::Io("publisher gone".into()))
        }
    }

    fn framed(len: u32, payload: &[u8], capacity: usize) -> FrameRegion {
        let region = FrameRegion::with_capacity(capacity).unwrap();
        {
            let mut writer = region.writer().unwrap();
            writer.payload_mut()[..payload.len()].copy_from_slice(payload);
            writer.set_declared_len(len);
        }
        region
    }

    fn fast() -> SessionConfig {
        SessionConfig {
            period_ms: 5,
            thread_name: "urcl-test".into(),
            ..SessionConfig::default()
        }
    }

    fn sample_aliases() -> AliasTable {
        AliasTable::new()
            .bus(BusAliases::new().alias(1, "FL").alias(2, "FR"))
            .bus(BusAliases::new().alias(1, "Arm"))
    }

    #[test]
    fn second_start_is_reported_and_ignored() {
        let reports = CountingReporter::default();
        let guard = StartGuard::with_reporter(reports.clone());
        let topics = MemoryTopics::new();

        let first = SimDriver::new().unwrap();
        let first_handle = first.handle();
        let session = guard
            .start_with_config(first, &sample_aliases(), Destination::LiveTopic(&topics), &fast())
            .unwrap();

        let second = SimDriver::new().unwrap();
        let second_handle = second.handle();
        let other_topics = MemoryTopics::new();
        let ignored = guard.start(second, &other_topics).unwrap();

        assert_eq!(reports.0.load(Ordering::SeqCst), 1);
        assert_eq!(first_handle.start_calls().unwrap(), 1);
        assert_eq!(second_handle.start_calls().unwrap(), 0);
        assert!(other_topics.names().unwrap().is_empty());
        assert_eq!(ignored.stop().unwrap(), 0);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(
            topics.latest("/URCL/Raw/Aliases").unwrap(),
            Some(br#"[{"1":"FL","2":"FR"},{"1":"Arm"}]"#.to_vec())
        );
        assert!(session.stop().unwrap() > 0);
    }

    #[test]
    fn second_external_start_yields_empty_payloads() {
        let reports = CountingReporter::default();
        let guard = StartGuard::with_reporter(reports.clone());
        let topics = MemoryTopics::new();
        let session = guard
            .start_with_config(
                SimDriver::new().unwrap(),
                &AliasTable::new(),
                Destination::LiveTopic(&topics),
                &fast(),
            )
            .unwrap();

        let mut accessor = guard
            .start_external_with_aliases(SimDriver::new().unwrap(), &sample_aliases())
            .unwrap();
        let snapshot = accessor.pull_owned().unwrap();
        assert_eq!(snapshot, OwnedSnapshot::default());
        assert_eq!(accessor.metrics().refreshes.get(), 0);
        assert_eq!(reports.0.load(Ordering::SeqCst), 1);
        session.stop().unwrap();
    }

    #[test]
    fn repeated_start_has_the_same_shape_as_a_real_start() {
        let reports = CountingReporter::default();
        let guard = StartGuard::with_reporter(reports.clone());
        let topics = MemoryTopics::new();
        let log = MemoryLog::new();

        let first = guard
            .start_with_config(
                SimDriver::new().unwrap(),
                &AliasTable::new(),
                Destination::LiveTopic(&topics),
                &fast(),
            )
            .unwrap();
        let second = guard
            .start_with_config(
                SimDriver::new().unwrap(),
                &AliasTable::new(),
                Destination::LiveTopic(&topics),
                &fast(),
            )
            .unwrap();
        let third = guard.start_log(SimDriver::new().unwrap(), &log).unwrap();

        assert_eq!(first.sink_kind(), second.sink_kind());
        assert_eq!(third.sink_kind(), SinkKind::LogEntry);
        assert!(!first.is_finished());
        assert!(!second.is_finished());
        assert_eq!(second.metrics().sink_failures.get(), 0);
        assert!(second.metrics().encode_text().contains("urcl_refreshes"));
        assert_eq!(reports.0.load(Ordering::SeqCst), 2);
        assert!(log.records("/URCL/Raw/Aliases").unwrap().is_empty());
        first.stop().unwrap();
    }

    #[test]
    fn dropped_handle_keeps_publishing() {
        let guard = StartGuard::new();
        let topics = MemoryTopics::new();
        let session = guard
            .start_with_config(
                SimDriver::new().unwrap(),
                &AliasTable::new(),
                Destination::LiveTopic(&topics),
                &fast(),
            )
            .unwrap();
        drop(session);

        thread::sleep(Duration::from_millis(15));
        let early = topics.publish_count("/URCL/Raw/Aliases").unwrap();
        thread::sleep(Duration::from_millis(40));
        let later = topics.publish_count("/URCL/Raw/Aliases").unwrap();
        assert!(later > early, "no publishes after the handle was dropped");
        assert!(guard.is_running());
    }

    #[test]
    fn failed_start_keeps_the_guard_claimed() {
        let reports = CountingReporter::default();
        let guard = StartGuard::with_reporter(reports.clone());
        let mut driver = FixedDriver::new(
            FrameRegion::with_capacity(8).unwrap(),
            FrameRegion::with_capacity(8).unwrap(),
        );
        driver.fail_start = true;
        let starts = driver.starts.clone();

        let err = guard.start_external(driver).err().unwrap();
        assert!(matches!(err, SessionError::Driver(DriverError::Unavailable(_))));
        assert!(guard.is_running());

        let retry = FixedDriver::new(
            FrameRegion::with_capacity(8).unwrap(),
            FrameRegion::with_capacity(8).unwrap(),
        );
        let retry_starts = retry.starts.clone();
        guard.start_external(retry).unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(retry_starts.load(Ordering::SeqCst), 0);
        assert_eq!(reports.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pull_exposes_exactly_the_declared_payload() {
        let guard = StartGuard::new();
        let payload = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let driver = FixedDriver::new(framed(5, &payload, 64), framed(0, &[], 64));
        let mut accessor = guard.start_external(driver).unwrap();

        let first = accessor.pull_owned().unwrap();
        assert_eq!(first.persistent, payload.to_vec());
        assert!(first.periodic.is_empty());
        assert_eq!(first.aliases, b"[]".to_vec());

        let second = accessor.pull_owned().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn pull_rejects_out_of_range_length() {
        let guard = StartGuard::new();
        let driver = FixedDriver::new(framed(70, &[], 64), framed(0, &[], 64));
        let mut accessor = guard.start_external(driver).unwrap();

        let err = accessor.pull().err().unwrap();
        assert!(matches!(
            err,
            SessionError::Region(RegionError::LengthOutOfRange {
                declared: 70,
                max: 60
            })
        ));
        assert_eq!(accessor.metrics().region_faults.get(), 1);
    }

    #[test]
    fn pull_tracks_sim_driver_records() {
        let guard = StartGuard::new();
        let driver = SimDriver::new().unwrap();
        let handle = driver.handle();
        let mut accessor = guard
            .start_external_with_aliases(driver, &sample_aliases())
            .unwrap();

        handle.push_firmware(4, &[1, 2, 3, 4, 5, 6]).unwrap();
        handle.push_periodic(4, 0, &[9; 8]).unwrap();
        {
            let snapshot = accessor.pull().unwrap();
            assert_eq!(records::decode_persistent(&snapshot.persistent).unwrap().len(), 1);
            assert_eq!(records::decode_periodic(&snapshot.periodic).unwrap().len(), 1);
            assert_eq!(snapshot.aliases, br#"[{"1":"FL","2":"FR"},{"1":"Arm"}]"#);
        }

        let first = accessor.pull_owned().unwrap();
        let second = accessor.pull_owned().unwrap();
        assert_eq!(first, second);
        assert!(second.periodic.is_empty());
        assert_eq!(accessor.metrics().refreshes.get(), 3);
    }

    #[test]
    fn live_session_publishes_one_triple_per_tick() {
        let guard = StartGuard::new();
        let topics = MemoryTopics::new();
        let driver = SimDriver::new().unwrap();
        let handle = driver.handle();
        let session = guard
            .start_with_config(driver, &AliasTable::new(), Destination::LiveTopic(&topics), &fast())
            .unwrap();
        assert_eq!(session.sink_kind(), SinkKind::LiveTopic);

        handle.push_firmware(1, &[0; 6]).unwrap();
        thread::sleep(Duration::from_millis(40));
        let metrics = session.metrics().clone();
        let ticks = session.stop().unwrap();

        let defaults = SinkTopics::default();
        assert!(ticks > 0);
        assert_eq!(metrics.deliveries.get(), ticks);
        for topic in [&defaults.persistent, &defaults.periodic, &defaults.aliases] {
            assert_eq!(topics.publish_count(&topic.name).unwrap(), ticks);
        }
        assert_eq!(topics.latest("/URCL/Raw/Aliases").unwrap(), Some(b"[]".to_vec()));
        assert_eq!(
            topics.latest("/URCL/Raw/Persistent").unwrap().map(|p| p.len()),
            Some(records::PERSISTENT_RECORD_SIZE)
        );
    }

    #[test]
    fn log_session_updates_snapshot_and_appends_batches() {
        let guard = StartGuard::new();
        let log = MemoryLog::new();
        let driver = SimDriver::new().unwrap();
        let handle = driver.handle();
        let session = guard
            .start_with_config(driver, &sample_aliases(), Destination::LogEntry(&log), &fast())
            .unwrap();

        handle.push_firmware(2, &[1; 6]).unwrap();
        handle.push_periodic(2, 0, &[5; 8]).unwrap();
        thread::sleep(Duration::from_millis(40));
        let ticks = session.stop().unwrap();

        assert_eq!(log.records("/URCL/Raw/Aliases").unwrap().len(), 1);
        let periodic = log.records("/URCL/Raw/Periodic").unwrap();
        assert_eq!(periodic.len() as u64, ticks);
        assert_eq!(periodic.iter().filter(|p| !p.is_empty()).count(), 1);
        let persistent = log.records("/URCL/Raw/Persistent").unwrap();
        assert_eq!(persistent.last().map(Vec::len), Some(records::PERSISTENT_RECORD_SIZE));
        assert!(persistent.len() <= 2);
    }

    #[test]
    fn region_fault_stops_push_session() {
        let guard = StartGuard::new();
        let topics = MemoryTopics::new();
        let driver = FixedDriver::new(framed(0, &[], 64), framed(70, &[], 64));
        let session = guard
            .start_with_config(driver, &AliasTable::new(), Destination::LiveTopic(&topics), &fast())
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(session.is_finished());
        assert_eq!(session.metrics().region_faults.get(), 1);
        assert!(matches!(session.stop(), Err(SessionError::Region(_))));
        assert_eq!(topics.publish_count("/URCL/Raw/Periodic").unwrap(), 0);
    }

    #[test]
    fn sink_failures_are_counted_and_ticking_continues() {
        let guard = StartGuard::new();
        let driver = FixedDriver::new(framed(0, &[], 16), framed(0, &[], 16));
        let session = guard
            .start_with_config(
                driver,
                &AliasTable::new(),
                Destination::Custom(Box::new(FailingSink)),
                &fast(),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(!session.is_finished());
        let metrics = session.metrics().clone();
        let ticks = session.stop().unwrap();
        assert!(ticks >= 2);
        assert_eq!(metrics.sink_failures.get(), ticks);
        assert_eq!(metrics.deliveries.get(), 0);
    }

    #[test]
    fn invalid_config_is_rejected_after_claiming() {
        let guard = StartGuard::new();
        let topics = MemoryTopics::new();
        let config = SessionConfig {
            period_ms: 0,
            ..SessionConfig::default()
        };
        let result = guard.start_with_config(
            SimDriver::new().unwrap(),
            &AliasTable::new(),
            Destination::LiveTopic(&topics),
            &config,
        );
        assert!(matches!(result.err(), Some(SessionError::Config(_))));
        assert!(guard.is_running());
    }
}
