// SPDX-License-Identifier: MIT

use dblkio::prelude::*;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    errors::*,
    fat32::{constant::*, region::Region},
};

/// On-disk locator, stored at byte `0x1A8` of the volume boot sector.
///
/// | off | field        |
/// |-----|--------------|
/// | 0   | signature    |
/// | 4   | panic_start  |
/// | 8   | panic_end    |
/// | 12  | config_start |
/// | 16  | config_end   |
/// | 20  | dblk_start   |
/// | 24  | dblk_end     |
/// | 28  | checksum     |
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct LocatorRaw {
    pub signature: U32,
    pub panic_start: U32,
    pub panic_end: U32,
    pub config_start: U32,
    pub config_end: U32,
    pub dblk_start: U32,
    pub dblk_end: U32,
    pub checksum: U16,
}

pub const LOCATOR_SIZE: usize = 30;
const _: () = assert!(core::mem::size_of::<LocatorRaw>() == LOCATOR_SIZE);
// Volume boot sectors only; never written into a partition-table sector.
const _: () = assert!(LOCATOR_OFFSET + LOCATOR_SIZE <= BOOT_SIGNATURE_OFFSET);

impl LocatorRaw {
    /// Wrapping sum of the structure's little-endian u16 words.
    pub fn word_sum(&self) -> u16 {
        self.as_bytes()
            .chunks_exact(2)
            .fold(0u16, |acc, w| acc.wrapping_add(u16::from_le_bytes([w[0], w[1]])))
    }

    /// Fills `checksum` so that all words sum to zero.
    pub fn seal(&mut self) {
        self.checksum = U16::new(0);
        self.checksum = U16::new(0u16.wrapping_sub(self.word_sum()));
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.signature.get() == LOCATOR_SIGNATURE && self.word_sum() == 0
    }
}

/// Sector ranges of the three regions the device writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeLocator {
    pub panic: Region,
    pub config: Region,
    pub dblk: Region,
}

impl VolumeLocator {
    pub fn new(panic: Region, config: Region, dblk: Region) -> Self {
        Self { panic, config, dblk }
    }

    pub fn encode(&self) -> LocatorRaw {
        let mut raw = LocatorRaw {
            signature: U32::new(LOCATOR_SIGNATURE),
            panic_start: U32::new(self.panic.start),
            panic_end: U32::new(self.panic.end),
            config_start: U32::new(self.config.start),
            config_end: U32::new(self.config.end),
            dblk_start: U32::new(self.dblk.start),
            dblk_end: U32::new(self.dblk.end),
            checksum: U16::new(0),
        };
        raw.seal();
        raw
    }

    /// `None` when the signature or checksum does not hold.
    pub fn decode(raw: &LocatorRaw) -> Option<Self> {
        if !raw.is_valid() {
            return None;
        }
        Some(Self {
            panic: Region::new(raw.panic_start.get(), raw.panic_end.get()),
            config: Region::new(raw.config_start.get(), raw.config_end.get()),
            dblk: Region::new(raw.dblk_start.get(), raw.dblk_end.get()),
        })
    }

    /// Writes the sealed locator into a loaded boot sector.
    pub fn write_into(&self, sector: &mut SectorBuf) -> FxResult<()> {
        self.encode()
            .write_to(&mut sector[LOCATOR_OFFSET..LOCATOR_OFFSET + LOCATOR_SIZE])
            .map_err(|_| FxError::Invalid("locator: short sector"))
    }

    pub fn from_sector(sector: &SectorBuf) -> Option<Self> {
        LocatorRaw::read_from_bytes(&sector[LOCATOR_OFFSET..LOCATOR_OFFSET + LOCATOR_SIZE])
            .ok()
            .and_then(|raw| Self::decode(&raw))
    }
}
