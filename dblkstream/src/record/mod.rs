// SPDX-License-Identifier: MIT

pub mod device;
pub mod legacy;

pub use device::DeviceFormat;
pub use legacy::LegacyFormat;

use alloc::vec::Vec;

use crate::errors::BadReason;

/// 32-bit value every landmark record carries at a fixed offset.
pub const SYNC_MAJIK: u32 = 0xDEDF_00EF;

/// Length rule of one record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenRule {
    Fixed(usize),
    OneOf(&'static [usize]),
    /// `base + table[raw[offset]]`; table slots holding 0 are invalid ids.
    SubTyped {
        offset: usize,
        base: usize,
        table: &'static [usize],
    },
    Variable { min: usize },
}

impl LenRule {
    pub fn min(&self) -> usize {
        match *self {
            LenRule::Fixed(n) => n,
            LenRule::OneOf(ns) => ns.iter().copied().min().unwrap_or(0),
            LenRule::SubTyped { offset, base, .. } => base.max(offset + 1),
            LenRule::Variable { min } => min,
        }
    }

    /// Checks that need only the header.
    pub fn check_declared(&self, len: usize) -> Result<(), BadReason> {
        let min = self.min();
        if len < min {
            return Err(BadReason::TooShort { len, min });
        }
        match *self {
            LenRule::Fixed(expected) if len != expected => {
                Err(BadReason::LengthMismatch { len, expected })
            }
            LenRule::OneOf(ns) if !ns.contains(&len) => Err(BadReason::LengthMismatch {
                len,
                expected: min,
            }),
            _ => Ok(()),
        }
    }

    /// Checks that need the whole record.
    pub fn check_body(&self, raw: &[u8]) -> Result<(), BadReason> {
        let LenRule::SubTyped {
            offset,
            base,
            table,
        } = *self
        else {
            return Ok(());
        };
        let id = raw[offset];
        let size = match table.get(id as usize) {
            Some(&n) if n != 0 => n,
            _ => return Err(BadReason::SubType(id)),
        };
        if raw.len() != base + size {
            return Err(BadReason::LengthMismatch {
                len: raw.len(),
                expected: base + size,
            });
        }
        Ok(())
    }
}

/// Decoded fixed part of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub len: usize,
    pub dtype: u16,
}

/// One record-header variant.
///
/// Each deployment reads its stream with exactly one format; the codec
/// and the resync scan are generic over it.
pub trait RecordFormat {
    fn name(&self) -> &'static str;

    fn header_len(&self) -> usize;

    /// Largest total length a record may declare.
    fn max_len(&self) -> usize;

    /// Records start on multiples of this, relative to the previous record.
    fn alignment(&self) -> usize {
        1
    }

    /// `raw` holds exactly `header_len()` bytes.
    fn header(&self, raw: &[u8]) -> RecordHeader;

    /// `None` for an unknown type.
    fn len_rule(&self, dtype: u16) -> Option<LenRule>;

    fn type_name(&self, dtype: u16) -> Option<&'static str>;

    /// Format-specific integrity checks on a complete record.
    fn verify(&self, _raw: &[u8]) -> Result<(), BadReason> {
        Ok(())
    }

    fn recnum(&self, _raw: &[u8]) -> Option<u32> {
        None
    }

    /// Bytes a landmark candidate window spans.
    fn landmark_len(&self) -> usize;

    /// Whether `window` (exactly `landmark_len()` bytes) starts a landmark.
    fn is_landmark(&self, window: &[u8]) -> bool;

    /// Pad bytes following a record of `len` bytes.
    #[inline]
    fn padding(&self, len: usize) -> usize {
        let a = self.alignment().max(1);
        (a - len % a) % a
    }
}

/// A validated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub dtype: u16,
    pub name: &'static str,
    pub recnum: Option<u32>,
    pub bytes: Vec<u8>,
}

impl Record {
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
