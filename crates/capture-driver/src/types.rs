use core::fmt;
use serde::Serialize;

/// 11-bit or 29-bit CAN identifier
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct CanId {
    raw: u32,
    extended: bool,
}

impl CanId {
    pub fn standard(id11: u16) -> Option<Self> {
        if id11 <= 0x7FF {
            Some(Self {
                raw: id11 as u32,
                extended: false,
            })
        } else {
            None
        }
    }

    pub fn extended(id29: u32) -> Option<Self> {
        if id29 <= 0x1FFF_FFFF {
            Some(Self {
                raw: id29,
                extended: true,
            })
        } else {
            None
        }
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Low 16 bits, the form stored in capture records.
    pub fn short(&self) -> u16 {
        (self.raw & 0xFFFF) as u16
    }

    /// Device number encoded in the low 6 bits.
    pub fn device(&self) -> u8 {
        (self.raw & 0x3F) as u8
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "0x{raw:08X}", raw = self.raw)
        } else {
            write!(f, "0x{raw:03X}", raw = self.raw)
        }
    }
}

// REV motor controller addressing: device type 2, manufacturer 5.
const DEVICE_TYPE: u32 = 2;
const MANUFACTURER: u32 = 5;

const FIRMWARE_API_CLASS: u32 = 9;
const FIRMWARE_API_INDEX: u32 = 8;
pub const FIRMWARE_API: u32 = (FIRMWARE_API_CLASS & 0x3F) << 4 | (FIRMWARE_API_INDEX & 0xF);
pub const FIRMWARE_MESSAGE_ID: u32 =
    ((DEVICE_TYPE & 0x1F) << 24) | ((MANUFACTURER & 0xFF) << 16) | ((FIRMWARE_API & 0x3FF) << 6);
pub const FIRMWARE_MESSAGE_MASK: u32 = 0x1FFF_FFC0;

const PERIODIC_API_CLASS: u32 = 46;
pub const PERIODIC_MESSAGE_ID: u32 =
    ((DEVICE_TYPE & 0x1F) << 24) | ((MANUFACTURER & 0xFF) << 16) | ((PERIODIC_API_CLASS & 0x3F) << 10);
pub const PERIODIC_MESSAGE_MASK: u32 = 0x1FFF_FC00;

/// Which capture stream a message belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MessageClass {
    /// Firmware replies, kept as a replace-on-write snapshot.
    Persistent,
    /// Status frames, forwarded as a fresh batch each refresh.
    Periodic,
}

impl MessageClass {
    pub fn classify(id: CanId) -> Option<Self> {
        if !id.is_extended() {
            return None;
        }
        if id.raw() & FIRMWARE_MESSAGE_MASK == FIRMWARE_MESSAGE_ID {
            Some(MessageClass::Persistent)
        } else if id.raw() & PERIODIC_MESSAGE_MASK == PERIODIC_MESSAGE_ID {
            Some(MessageClass::Periodic)
        } else {
            None
        }
    }
}

/// One message as delivered by a CAN stream session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamMessage {
    pub id: CanId,
    /// Milliseconds on the capture clock.
    pub timestamp_ms: u32,
    pub data: [u8; 8],
}

impl StreamMessage {
    pub fn new(id: CanId, timestamp_ms: u32, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id,
            timestamp_ms,
            data: buf,
        })
    }

    /// Firmware reply from `device` (0..=63).
    pub fn firmware(device: u8, timestamp_ms: u32, data: &[u8]) -> Option<Self> {
        let id = CanId::extended(FIRMWARE_MESSAGE_ID | (device as u32 & 0x3F))?;
        Self::new(id, timestamp_ms, data)
    }

    /// Periodic status frame `index` (0..=15) from `device` (0..=63).
    pub fn periodic(device: u8, index: u8, timestamp_ms: u32, data: &[u8]) -> Option<Self> {
        if index > 0xF {
            return None;
        }
        let raw = PERIODIC_MESSAGE_ID | ((index as u32) << 6) | (device as u32 & 0x3F);
        Self::new(CanId::extended(raw)?, timestamp_ms, data)
    }

    pub fn class(&self) -> Option<MessageClass> {
        MessageClass::classify(self.id)
    }
}
