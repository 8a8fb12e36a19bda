//! Record layouts inside the persistent and periodic payloads.
//!
//! Persistent record (8 bytes): `short_id: u16 LE`, `data: [u8; 6]`.
//! Periodic record (14 bytes): `timestamp_ms: u32 LE`, `short_id: u16 LE`, `data: [u8; 8]`.

use crate::{DriverError, Result};
use serde::Serialize;

pub const PERSISTENT_RECORD_SIZE: usize = 8;
pub const PERIODIC_RECORD_SIZE: usize = 14;
pub const MAX_PERSISTENT_RECORDS: usize = 200;
pub const MAX_PERIODIC_RECORDS: usize = 500;

/// Region capacity (prefix included) needed for a full persistent table.
pub const PERSISTENT_REGION_CAPACITY: usize = 4 + PERSISTENT_RECORD_SIZE * MAX_PERSISTENT_RECORDS;
/// Region capacity (prefix included) needed for a full periodic batch.
pub const PERIODIC_REGION_CAPACITY: usize = 4 + PERIODIC_RECORD_SIZE * MAX_PERIODIC_RECORDS;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct PersistentRecord {
    pub short_id: u16,
    pub data: [u8; 6],
}

impl PersistentRecord {
    pub fn encode(&self) -> [u8; PERSISTENT_RECORD_SIZE] {
        let mut out = [0u8; PERSISTENT_RECORD_SIZE];
        out[..2].copy_from_slice(&self.short_id.to_le_bytes());
        out[2..].copy_from_slice(&self.data);
        out
    }

    fn decode(chunk: &[u8]) -> Option<Self> {
        let short_id = u16::from_le_bytes(chunk.get(0..2)?.try_into().ok()?);
        let data = chunk.get(2..8)?.try_into().ok()?;
        Some(Self { short_id, data })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct PeriodicRecord {
    pub timestamp_ms: u32,
    pub short_id: u16,
    pub data: [u8; 8],
}

impl PeriodicRecord {
    pub fn encode(&self) -> [u8; PERIODIC_RECORD_SIZE] {
        let mut out = [0u8; PERIODIC_RECORD_SIZE];
        out[..4].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        out[4..6].copy_from_slice(&self.short_id.to_le_bytes());
        out[6..].copy_from_slice(&self.data);
        out
    }

    fn decode(chunk: &[u8]) -> Option<Self> {
        let timestamp_ms = u32::from_le_bytes(chunk.get(0..4)?.try_into().ok()?);
        let short_id = u16::from_le_bytes(chunk.get(4..6)?.try_into().ok()?);
        let data = chunk.get(6..14)?.try_into().ok()?;
        Some(Self {
            timestamp_ms,
            short_id,
            data,
        })
    }
}

pub fn decode_persistent(payload: &[u8]) -> Result<Vec<PersistentRecord>> {
    if payload.len() % PERSISTENT_RECORD_SIZE != 0 {
        return Err(DriverError::InvalidRecord("persistent payload not record aligned"));
    }
    payload
        .chunks_exact(PERSISTENT_RECORD_SIZE)
        .map(|c| PersistentRecord::decode(c).ok_or(DriverError::InvalidRecord("persistent")))
        .collect()
}

pub fn decode_periodic(payload: &[u8]) -> Result<Vec<PeriodicRecord>> {
    if payload.len() % PERIODIC_RECORD_SIZE != 0 {
        return Err(DriverError::InvalidRecord("periodic payload not record aligned"));
    }
    payload
        .chunks_exact(PERIODIC_RECORD_SIZE)
        .map(|c| PeriodicRecord::decode(c).ok_or(DriverError::InvalidRecord("periodic")))
        .collect()
}
