// SPDX-License-Identifier: MIT

//! Legacy wire form: 3-byte header, big-endian length.

use zerocopy::byteorder::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{LenRule, RecordFormat, RecordHeader, SYNC_MAJIK};

pub const DT_IGNORE: u16 = 0;
pub const DT_CONFIG: u16 = 1;
pub const DT_SYNC: u16 = 2;
pub const DT_SYNC_RESTART: u16 = 3;
pub const DT_PANIC: u16 = 4;
pub const DT_GPS_TIME: u16 = 5;
pub const DT_GPS_POS: u16 = 6;
pub const DT_SENSOR_DATA: u16 = 7;
pub const DT_SENSOR_SET: u16 = 8;
pub const DT_TEST: u16 = 9;
pub const DT_NOTE: u16 = 10;
pub const DT_GPS_RAW: u16 = 11;
pub const DT_VERSION: u16 = 12;
pub const DT_EVENT: u16 = 13;
pub const DT_DEBUG: u16 = 14;
pub const DT_MAX: u16 = 15;

pub const LEGACY_HEADER_LEN: usize = 3;
pub const LEGACY_SYNC_LEN: usize = 11;
const RESTART_LENS: &[usize] = &[11, 13];

/// Payload size per sensor id (id 0 unused).
pub const SENSOR_PAYLOAD: [usize; 10] = [0, 2, 2, 2, 4, 6, 2, 2, 4, 6];
pub const SENSOR_DATA_HEADER: usize = 12;

/// SYNC / SYNC_RESTART prefix.
///
/// | off | field |
/// |-----|-------|
/// | 0   | len   |
/// | 2   | dtype |
/// | 3   | stamp |
/// | 7   | majik |
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct LegacySync {
    pub len: U16,
    pub dtype: u8,
    pub stamp: U32,
    pub majik: U32,
}

const _: () = assert!(core::mem::size_of::<LegacySync>() == LEGACY_SYNC_LEN);

impl LegacySync {
    pub fn new(stamp: u32) -> Self {
        Self {
            len: U16::new(LEGACY_SYNC_LEN as u16),
            dtype: DT_SYNC as u8,
            stamp: U32::new(stamp),
            majik: U32::new(SYNC_MAJIK),
        }
    }
}

/// Header: `len` (u16, big-endian) at 0, `dtype` (u8) at 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyFormat;

impl RecordFormat for LegacyFormat {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn header_len(&self) -> usize {
        LEGACY_HEADER_LEN
    }

    /// The 16-bit length field is the only bound.
    fn max_len(&self) -> usize {
        u16::MAX as usize
    }

    fn header(&self, raw: &[u8]) -> RecordHeader {
        let len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
        RecordHeader {
            len,
            dtype: raw[2] as u16,
        }
    }

    fn len_rule(&self, dtype: u16) -> Option<LenRule> {
        let rule = match dtype {
            DT_IGNORE | DT_CONFIG | DT_TEST => LenRule::Variable { min: 3 },
            DT_SYNC => LenRule::Fixed(LEGACY_SYNC_LEN),
            DT_SYNC_RESTART => LenRule::OneOf(RESTART_LENS),
            DT_PANIC => LenRule::Fixed(17),
            DT_GPS_TIME => LenRule::Fixed(25),
            DT_GPS_POS => LenRule::Fixed(28),
            DT_SENSOR_DATA => LenRule::SubTyped {
                offset: 3,
                base: SENSOR_DATA_HEADER,
                table: &SENSOR_PAYLOAD,
            },
            DT_SENSOR_SET => LenRule::Variable { min: 14 },
            DT_NOTE => LenRule::Variable { min: 12 },
            DT_GPS_RAW => LenRule::Variable { min: 8 },
            DT_VERSION => LenRule::Fixed(6),
            DT_EVENT => LenRule::Fixed(10),
            DT_DEBUG => LenRule::Variable { min: 7 },
            _ => return None,
        };
        Some(rule)
    }

    fn type_name(&self, dtype: u16) -> Option<&'static str> {
        const NAMES: [&str; DT_MAX as usize] = [
            "IGNORE",
            "CONFIG",
            "SYNC",
            "SYNC_RESTART",
            "PANIC",
            "GPS_TIME",
            "GPS_POS",
            "SENSOR_DATA",
            "SENSOR_SET",
            "TEST",
            "NOTE",
            "GPS_RAW",
            "VERSION",
            "EVENT",
            "DEBUG",
        ];
        NAMES.get(dtype as usize).copied()
    }

    fn landmark_len(&self) -> usize {
        LEGACY_SYNC_LEN
    }

    fn is_landmark(&self, window: &[u8]) -> bool {
        let Ok(sync) = LegacySync::read_from_bytes(window) else {
            return false;
        };
        if sync.majik.get() != SYNC_MAJIK {
            return false;
        }
        let len = sync.len.get() as usize;
        match sync.dtype as u16 {
            DT_SYNC => len == LEGACY_SYNC_LEN,
            DT_SYNC_RESTART => RESTART_LENS.contains(&len),
            _ => false,
        }
    }
}
