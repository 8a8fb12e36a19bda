use crate::records::{
    PeriodicRecord, PersistentRecord, MAX_PERIODIC_RECORDS, MAX_PERSISTENT_RECORDS,
    PERIODIC_REGION_CAPACITY, PERIODIC_RECORD_SIZE, PERSISTENT_REGION_CAPACITY,
    PERSISTENT_RECORD_SIZE,
};
use crate::{CaptureDriver, DriverError, FrameRegion, MessageClass, Result, StreamMessage};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, trace};

/// Refreshes between firmware requests for devices that never reported one.
const FIRMWARE_REQUEST_INTERVAL: u32 = 20;

#[derive(Default)]
struct SimState {
    running: bool,
    start_calls: u32,
    refresh_calls: u64,
    firmware_queue: VecDeque<StreamMessage>,
    periodic_queue: VecDeque<StreamMessage>,
    dropped: u64,
    persistent_table: Vec<PersistentRecord>,
    read_count: u32,
    devices_found: u64,
    devices_firmware: u64,
    /// Firmware requests issued per device.
    firmware_requests: BTreeMap<u8, u32>,
}

/// An in-process capture driver that lays out records like the native REV
/// capture driver. Traffic is injected through a [`SimHandle`].
pub struct SimDriver {
    state: Arc<Mutex<SimState>>,
    persistent: FrameRegion,
    periodic: FrameRegion,
    epoch: Instant,
}

impl SimDriver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            state: Arc::new(Mutex::new(SimState::default())),
            persistent: FrameRegion::with_capacity(PERSISTENT_REGION_CAPACITY)?,
            periodic: FrameRegion::with_capacity(PERIODIC_REGION_CAPACITY)?,
            epoch: Instant::now(),
        })
    }

    /// Handle for injecting traffic and inspecting the driver after it has
    /// been moved into a session.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: self.state.clone(),
            epoch: self.epoch,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>> {
        self.state.lock().map_err(|_| DriverError::Poisoned)
    }
}

impl CaptureDriver for SimDriver {
    fn name(&self) -> &str {
        "sim"
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.lock()?;
        state.start_calls += 1;
        if state.running {
            return Ok(());
        }
        state.running = true;
        debug!(
            persistent = self.persistent.capacity(),
            periodic = self.periodic.capacity(),
            "sim driver started"
        );
        Ok(())
    }

    fn persistent_buffer(&self) -> Result<FrameRegion> {
        Ok(self.persistent.clone())
    }

    fn periodic_buffer(&self) -> Result<FrameRegion> {
        Ok(self.periodic.clone())
    }

    fn refresh(&mut self) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if !state.running {
            return Ok(());
        }
        state.refresh_calls += 1;

        state.read_count += 1;
        if state.read_count >= FIRMWARE_REQUEST_INTERVAL {
            state.read_count = 0;
            let unknown = state.devices_found & !state.devices_firmware;
            for device in 0..64u8 {
                if (unknown >> device) & 1 == 1 {
                    trace!(device, "requesting firmware");
                    *state.firmware_requests.entry(device).or_insert(0) += 1;
                }
            }
        }

        while let Some(msg) = state.firmware_queue.pop_front() {
            let record = PersistentRecord {
                short_id: msg.id.short(),
                data: [
                    msg.data[0], msg.data[1], msg.data[2], msg.data[3], msg.data[4], msg.data[5],
                ],
            };
            if let Some(existing) = state
                .persistent_table
                .iter_mut()
                .find(|r| r.short_id == record.short_id)
            {
                existing.data = record.data;
            } else if state.persistent_table.len() < MAX_PERSISTENT_RECORDS {
                state.persistent_table.push(record);
            } else {
                state.dropped += 1;
            }
            let bit = 1u64 << msg.id.device();
            state.devices_found |= bit;
            state.devices_firmware |= bit;
        }

        let batch = state.periodic_queue.len().min(MAX_PERIODIC_RECORDS);
        let mut periodic = Vec::with_capacity(batch * PERIODIC_RECORD_SIZE);
        for msg in state.periodic_queue.drain(..batch) {
            let record = PeriodicRecord {
                timestamp_ms: msg.timestamp_ms,
                short_id: msg.id.short(),
                data: msg.data,
            };
            periodic.extend_from_slice(&record.encode());
            state.devices_found |= 1u64 << msg.id.device();
        }

        let mut persistent =
            Vec::with_capacity(state.persistent_table.len() * PERSISTENT_RECORD_SIZE);
        for record in &state.persistent_table {
            persistent.extend_from_slice(&record.encode());
        }

        // Both writers are held together so readers never observe a mixed pair.
        let mut persistent_writer = self.persistent.writer()?;
        let mut periodic_writer = self.periodic.writer()?;
        persistent_writer.write_frame(&persistent)?;
        periodic_writer.write_frame(&periodic)?;
        Ok(())
    }
}

/// Cloneable control handle for a [`SimDriver`].
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
    epoch: Instant,
}

impl SimHandle {
    fn lock(&self) -> Result<MutexGuard<'_, SimState>> {
        self.state.lock().map_err(|_| DriverError::Poisoned)
    }

    /// Milliseconds since the driver was created.
    pub fn now_ms(&self) -> u32 {
        (self.epoch.elapsed().as_millis() & 0xFFFF_FFFF) as u32
    }

    /// Queue a message for the next refresh. Returns `false` when the message
    /// is not capture traffic or its stream queue is full.
    pub fn push(&self, msg: StreamMessage) -> Result<bool> {
        let mut state = self.lock()?;
        let (queue_len, limit) = match msg.class() {
            Some(MessageClass::Persistent) => (state.firmware_queue.len(), MAX_PERSISTENT_RECORDS),
            Some(MessageClass::Periodic) => (state.periodic_queue.len(), MAX_PERIODIC_RECORDS),
            None => return Ok(false),
        };
        if queue_len >= limit {
            state.dropped += 1;
            return Ok(false);
        }
        match msg.class() {
            Some(MessageClass::Persistent) => state.firmware_queue.push_back(msg),
            _ => state.periodic_queue.push_back(msg),
        }
        Ok(true)
    }

    pub fn push_firmware(&self, device: u8, data: &[u8]) -> Result<bool> {
        let msg = StreamMessage::firmware(device, self.now_ms(), data)
            .ok_or(DriverError::InvalidRecord("firmware message"))?;
        self.push(msg)
    }

    pub fn push_periodic(&self, device: u8, index: u8, data: &[u8]) -> Result<bool> {
        let msg = StreamMessage::periodic(device, index, self.now_ms(), data)
            .ok_or(DriverError::InvalidRecord("periodic message"))?;
        self.push(msg)
    }

    pub fn start_calls(&self) -> Result<u32> {
        Ok(self.lock()?.start_calls)
    }

    pub fn refresh_calls(&self) -> Result<u64> {
        Ok(self.lock()?.refresh_calls)
    }

    /// Bitmask of device numbers seen on either stream.
    pub fn devices_found(&self) -> Result<u64> {
        Ok(self.lock()?.devices_found)
    }

    /// Number of firmware requests issued for `device`.
    pub fn firmware_requests(&self, device: u8) -> Result<u32> {
        Ok(self
            .lock()?
            .firmware_requests
            .get(&device)
            .copied()
            .unwrap_or(0))
    }

    pub fn dropped(&self) -> Result<u64> {
        Ok(self.lock()?.dropped)
    }
}
