//! Length-prefixed shared frame regions.
//!
//! ```text
//! [declared_len: u32 LE][payload: declared_len bytes][unused capacity]
//! ```
//!
//! The driver is the only writer. Readers take a [`FrameView`], which holds the
//! region's read lock and exposes exactly the declared payload.

use crate::RegionError;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Size of the little-endian length prefix.
pub const PREFIX_LEN: usize = 4;

/// A fixed-capacity region shared between a driver and its readers.
#[derive(Clone)]
pub struct FrameRegion {
    bytes: Arc<RwLock<Box<[u8]>>>,
    capacity: usize,
}

impl FrameRegion {
    /// Allocate a zeroed region (declared length 0).
    pub fn with_capacity(capacity: usize) -> Result<Self, RegionError> {
        Self::from_bytes(vec![0u8; capacity])
    }

    /// Wrap raw bytes, prefix included. The prefix is not validated here; that
    /// happens on every read.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RegionError> {
        let capacity = bytes.len();
        if capacity < PREFIX_LEN {
            return Err(RegionError::TooSmall { capacity });
        }
        Ok(Self {
            bytes: Arc::new(RwLock::new(bytes.into_boxed_slice())),
            capacity,
        })
    }

    /// Total size, prefix included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest payload the region can describe.
    pub fn payload_capacity(&self) -> usize {
        self.capacity - PREFIX_LEN
    }

    /// Read the current prefix and validate it against the capacity.
    pub fn declared_len(&self) -> Result<usize, RegionError> {
        let guard = self.bytes.read().map_err(|_| RegionError::Poisoned)?;
        checked_len(&guard, self.payload_capacity())
    }

    /// Zero-copy view of the payload currently declared by the prefix.
    ///
    /// A length larger than the payload capacity is a consistency fault and is
    /// reported instead of truncated.
    pub fn view(&self) -> Result<FrameView<'_>, RegionError> {
        let guard = self.bytes.read().map_err(|_| RegionError::Poisoned)?;
        let len = checked_len(&guard, self.payload_capacity())?;
        Ok(FrameView {
            guard: Some(guard),
            len,
        })
    }

    /// Exclusive writer access for the owning driver.
    pub fn writer(&self) -> Result<RegionWriter<'_>, RegionError> {
        let guard = self.bytes.write().map_err(|_| RegionError::Poisoned)?;
        Ok(RegionWriter { guard })
    }
}

impl fmt::Debug for FrameRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRegion")
            .field("capacity", &self.capacity)
            .field("declared_len", &self.declared_len().ok())
            .finish()
    }
}

fn read_prefix(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; PREFIX_LEN];
    if let Some(prefix) = bytes.get(..PREFIX_LEN) {
        raw.copy_from_slice(prefix);
    }
    u32::from_le_bytes(raw)
}

fn checked_len(bytes: &[u8], max: usize) -> Result<usize, RegionError> {
    let declared = read_prefix(bytes) as usize;
    if declared > max {
        return Err(RegionError::LengthOutOfRange { declared, max });
    }
    Ok(declared)
}

/// Read-only view of a region's declared payload.
///
/// While a view is alive the driver cannot rewrite the region.
pub struct FrameView<'a> {
    guard: Option<RwLockReadGuard<'a, Box<[u8]>>>,
    len: usize,
}

impl FrameView<'_> {
    /// A view with no backing region, used when nothing was captured.
    pub fn empty() -> Self {
        FrameView {
            guard: None,
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.guard {
            Some(bytes) => bytes.get(PREFIX_LEN..PREFIX_LEN + self.len).unwrap_or(&[]),
            None => &[],
        }
    }
}

impl Deref for FrameView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for FrameView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameView").field("len", &self.len).finish()
    }
}

/// Driver-side write access to a region.
pub struct RegionWriter<'a> {
    guard: RwLockWriteGuard<'a, Box<[u8]>>,
}

impl RegionWriter<'_> {
    /// Mutable payload area, excluding the prefix.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.guard.get_mut(PREFIX_LEN..).unwrap_or(&mut [])
    }

    /// Store a raw prefix value exactly as a native driver would, without
    /// checking it against the capacity.
    pub fn set_declared_len(&mut self, len: u32) {
        if let Some(prefix) = self.guard.get_mut(..PREFIX_LEN) {
            prefix.copy_from_slice(&len.to_le_bytes());
        }
    }

    /// Copy `payload` into the region and update the prefix.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<(), RegionError> {
        let max = self.guard.len() - PREFIX_LEN;
        if payload.len() > max {
            return Err(RegionError::LengthOutOfRange {
                declared: payload.len(),
                max,
            });
        }
        if let Some(dst) = self.payload_mut().get_mut(..payload.len()) {
            dst.copy_from_slice(payload);
        }
        self.set_declared_len(payload.len() as u32);
        Ok(())
    }
}
