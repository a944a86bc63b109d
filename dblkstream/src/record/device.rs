// SPDX-License-Identifier: MIT

//! On-device form: 20-byte little-endian header, quad-aligned records.

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{LenRule, RecordFormat, RecordHeader, SYNC_MAJIK};
use crate::errors::BadReason;

pub const DT_REBOOT: u16 = 1;
pub const DT_VERSION: u16 = 2;
pub const DT_SYNC: u16 = 3;
pub const DT_EVENT: u16 = 4;
pub const DT_DEBUG: u16 = 5;
pub const DT_SYNC_FLUSH: u16 = 6;
pub const DT_SYNC_REBOOT: u16 = 7;
pub const DT_GPS_VERSION: u16 = 16;
pub const DT_GPS_TIME: u16 = 17;
pub const DT_GPS_GEO: u16 = 18;
pub const DT_GPS_XYZ: u16 = 19;
pub const DT_SENSOR_DATA: u16 = 20;
pub const DT_SENSOR_SET: u16 = 21;
pub const DT_TEST: u16 = 22;
pub const DT_NOTE: u16 = 23;
pub const DT_CONFIG: u16 = 24;
pub const DT_GPS_PROTO_STATS: u16 = 25;
pub const DT_GPS_TRK: u16 = 26;
pub const DT_GPS_CLK: u16 = 27;
pub const DT_GPS_RAW_SIRFBIN: u16 = 32;
pub const DT_TAGNET: u16 = 33;
pub const DT_RADIO: u16 = 34;

pub const DEVICE_HEADER_LEN: usize = 20;
pub const DEVICE_SYNC_LEN: usize = 28;
pub const DEVICE_REBOOT_LEN: usize = 152;
pub const DEVICE_VERSION_LEN: usize = 376;
pub const DEVICE_EVENT_LEN: usize = 40;
pub const DEVICE_MAX_LEN: usize = 1024;
pub const DEVICE_ALIGNMENT: usize = 4;

const RECSUM_OFFSET: usize = 18;

/// Common record header.
///
/// | off | field   |
/// |-----|---------|
/// | 0   | len     |
/// | 2   | dtype   |
/// | 4   | recnum  |
/// | 8   | rtctime |
/// | 18  | recsum  |
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct DeviceHeader {
    pub len: U16,
    pub dtype: U16,
    pub recnum: U32,
    pub rtctime: [u8; 10],
    pub recsum: U16,
}

/// SYNC family record; also the first 28 bytes of a REBOOT record.
///
/// | off | field     |
/// |-----|-----------|
/// | 0   | header    |
/// | 20  | prev_sync |
/// | 24  | majik     |
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct DeviceSync {
    pub header: DeviceHeader,
    pub prev_sync: U32,
    pub majik: U32,
}

const _: () = assert!(core::mem::size_of::<DeviceHeader>() == DEVICE_HEADER_LEN);
const _: () = assert!(core::mem::size_of::<DeviceSync>() == DEVICE_SYNC_LEN);

impl DeviceHeader {
    pub fn new(len: u16, dtype: u16, recnum: u32) -> Self {
        Self {
            len: U16::new(len),
            dtype: U16::new(dtype),
            recnum: U32::new(recnum),
            rtctime: [0; 10],
            recsum: U16::new(0),
        }
    }
}

impl DeviceSync {
    pub fn new(dtype: u16, recnum: u32, prev_sync: u32) -> Self {
        let mut sync = Self {
            header: DeviceHeader::new(DEVICE_SYNC_LEN as u16, dtype, recnum),
            prev_sync: U32::new(prev_sync),
            majik: U32::new(SYNC_MAJIK),
        };
        sync.header.recsum = U16::new(record_sum(sync.as_bytes()));
        sync
    }
}

/// u16 sum of every record byte except the two `recsum` bytes.
pub fn record_sum(raw: &[u8]) -> u16 {
    raw.iter()
        .enumerate()
        .filter(|(i, _)| !(RECSUM_OFFSET..RECSUM_OFFSET + 2).contains(i))
        .fold(0u16, |acc, (_, &b)| acc.wrapping_add(b as u16))
}

/// Writes `recsum` into a complete record.
pub fn seal_record(raw: &mut [u8]) {
    let sum = record_sum(raw);
    raw[RECSUM_OFFSET..RECSUM_OFFSET + 2].copy_from_slice(&sum.to_le_bytes());
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFormat;

impl RecordFormat for DeviceFormat {
    fn name(&self) -> &'static str {
        "device"
    }

    fn header_len(&self) -> usize {
        DEVICE_HEADER_LEN
    }

    fn max_len(&self) -> usize {
        DEVICE_MAX_LEN
    }

    fn alignment(&self) -> usize {
        DEVICE_ALIGNMENT
    }

    fn header(&self, raw: &[u8]) -> RecordHeader {
        RecordHeader {
            len: u16::from_le_bytes([raw[0], raw[1]]) as usize,
            dtype: u16::from_le_bytes([raw[2], raw[3]]),
        }
    }

    fn len_rule(&self, dtype: u16) -> Option<LenRule> {
        let rule = match dtype {
            DT_REBOOT => LenRule::Fixed(DEVICE_REBOOT_LEN),
            DT_VERSION => LenRule::Fixed(DEVICE_VERSION_LEN),
            DT_SYNC | DT_SYNC_FLUSH | DT_SYNC_REBOOT => LenRule::Fixed(DEVICE_SYNC_LEN),
            DT_EVENT => LenRule::Fixed(DEVICE_EVENT_LEN),
            DT_GPS_VERSION | DT_GPS_TIME | DT_GPS_GEO | DT_GPS_XYZ | DT_SENSOR_DATA
            | DT_SENSOR_SET | DT_GPS_RAW_SIRFBIN => LenRule::Variable { min: 28 },
            DT_DEBUG | DT_TEST | DT_NOTE | DT_CONFIG | DT_GPS_PROTO_STATS | DT_GPS_TRK
            | DT_GPS_CLK | DT_TAGNET | DT_RADIO => LenRule::Variable {
                min: DEVICE_HEADER_LEN,
            },
            _ => return None,
        };
        Some(rule)
    }

    fn type_name(&self, dtype: u16) -> Option<&'static str> {
        let name = match dtype {
            DT_REBOOT => "REBOOT",
            DT_VERSION => "VERSION",
            DT_SYNC => "SYNC",
            DT_EVENT => "EVENT",
            DT_DEBUG => "DEBUG",
            DT_SYNC_FLUSH => "SYNC_FLUSH",
            DT_SYNC_REBOOT => "SYNC_REBOOT",
            DT_GPS_VERSION => "GPS_VERSION",
            DT_GPS_TIME => "GPS_TIME",
            DT_GPS_GEO => "GPS_GEO",
            DT_GPS_XYZ => "GPS_XYZ",
            DT_SENSOR_DATA => "SENSOR_DATA",
            DT_SENSOR_SET => "SENSOR_SET",
            DT_TEST => "TEST",
            DT_NOTE => "NOTE",
            DT_CONFIG => "CONFIG",
            DT_GPS_PROTO_STATS => "GPS_PROTO_STATS",
            DT_GPS_TRK => "GPS_TRK",
            DT_GPS_CLK => "GPS_CLK",
            DT_GPS_RAW_SIRFBIN => "GPS_RAW_SIRFBIN",
            DT_TAGNET => "TAGNET",
            DT_RADIO => "RADIO",
            _ => return None,
        };
        Some(name)
    }

    fn verify(&self, raw: &[u8]) -> Result<(), BadReason> {
        let stored = u16::from_le_bytes([raw[RECSUM_OFFSET], raw[RECSUM_OFFSET + 1]]);
        let computed = record_sum(raw);
        if stored != computed {
            return Err(BadReason::Checksum { stored, computed });
        }
        if self.recnum(raw) == Some(0) {
            return Err(BadReason::ZeroRecnum);
        }
        Ok(())
    }

    fn recnum(&self, raw: &[u8]) -> Option<u32> {
        raw.get(4..8)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn landmark_len(&self) -> usize {
        DEVICE_SYNC_LEN
    }

    fn is_landmark(&self, window: &[u8]) -> bool {
        let Ok(sync) = DeviceSync::read_from_bytes(window) else {
            return false;
        };
        if sync.majik.get() != SYNC_MAJIK {
            return false;
        }
        let len = sync.header.len.get() as usize;
        match sync.header.dtype.get() {
            DT_SYNC | DT_SYNC_FLUSH | DT_SYNC_REBOOT => len == DEVICE_SYNC_LEN,
            DT_REBOOT => len == DEVICE_REBOOT_LEN,
            _ => false,
        }
    }
}
