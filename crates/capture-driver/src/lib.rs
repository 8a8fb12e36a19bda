//! capture-driver: shared frame regions and the capture driver interface
//!
//! A capture driver decodes CAN traffic from motor controllers into two
//! length-prefixed regions: a persistent snapshot and a periodic batch. This
//! crate defines the region framing, the driver trait, and the record layout
//! inside each payload. The default build enables a `sim` driver so that the
//! pipeline runs on any host without native libraries.

mod types;
pub use types::{
    CanId, MessageClass, StreamMessage, FIRMWARE_API, FIRMWARE_MESSAGE_ID, FIRMWARE_MESSAGE_MASK,
    PERIODIC_MESSAGE_ID, PERIODIC_MESSAGE_MASK,
};

mod error;
pub use error::{DriverError, RegionError, Result};

mod region;
pub use region::{FrameRegion, FrameView, RegionWriter, PREFIX_LEN};

pub mod records;

mod traits;
pub use traits::CaptureDriver;

#[cfg(feature = "sim")]
mod sim;

#[cfg(feature = "sim")]
pub use sim::{SimDriver, SimHandle};
