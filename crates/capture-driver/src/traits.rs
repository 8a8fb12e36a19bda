use crate::{FrameRegion, Result};

/// A capture driver that fills two shared frame regions.
///
/// Implementations own the regions and are their only writer. Callers read
/// them through [`FrameRegion::view`] after [`CaptureDriver::refresh`] returns.
pub trait CaptureDriver: Send {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "capture-driver"
    }

    /// Begin capturing. Calling it again should be harmless.
    fn start(&mut self) -> Result<()>;

    /// Replace-on-write snapshot region.
    fn persistent_buffer(&self) -> Result<FrameRegion>;

    /// Per-refresh batch region.
    fn periodic_buffer(&self) -> Result<FrameRegion>;

    /// Update both regions (payloads and length prefixes) for the current instant.
    fn refresh(&mut self) -> Result<()>;
}

impl<D: CaptureDriver + ?Sized> CaptureDriver for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn persistent_buffer(&self) -> Result<FrameRegion> {
        (**self).persistent_buffer()
    }

    fn periodic_buffer(&self) -> Result<FrameRegion> {
        (**self).periodic_buffer()
    }

    fn refresh(&mut self) -> Result<()> {
        (**self).refresh()
    }
}
