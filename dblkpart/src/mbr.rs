// SPDX-License-Identifier: MIT

use dblkio::prelude::*;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::errors::*;

pub const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Byte offset of the partition table inside sector 0.
pub const MBR_TABLE_OFFSET: usize = 0x1BE;

/// Partition types the device tooling accepts as FAT32
/// (CHS, LBA and their hidden variants).
pub const FAT32_PART_TYPES: [u8; 4] = [0x0B, 0x0C, 0x1B, 0x1C];

/// One 16-byte partition table entry.
///
/// | off | field        |
/// |-----|--------------|
/// | 0   | boot_flag    |
/// | 1   | starting_chs |
/// | 4   | part_type    |
/// | 5   | end_chs      |
/// | 8   | start_lba    |
/// | 12  | sectors      |
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct MbrEntry {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: U32,
    pub sectors: U32,
}

const _: () = assert!(core::mem::size_of::<MbrEntry>() == 16);

impl MbrEntry {
    #[inline]
    pub fn new(boot_flag: u8, part_type: u8, start_lba: u32, sectors: u32) -> Self {
        Self {
            boot_flag,
            starting_chs: [0xFE, 0xFF, 0xFF],
            part_type,
            end_chs: [0xFE, 0xFF, 0xFF],
            start_lba: U32::new(start_lba),
            sectors: U32::new(sectors),
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new_zeroed()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.part_type == 0
    }

    #[inline]
    pub fn is_fat32_type(&self) -> bool {
        FAT32_PART_TYPES.contains(&self.part_type)
    }

    /// FAT32 partition with a sane boot flag and a nonzero extent.
    #[inline]
    pub fn is_fat32_candidate(&self) -> bool {
        matches!(self.boot_flag, 0x00 | 0x80)
            && self.is_fat32_type()
            && self.start_lba.get() != 0
            && self.sectors.get() != 0
    }
}

/// Partition table and trailing signature of sector 0 (offset 0x1BE..0x200).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct Mbr {
    pub entries: [MbrEntry; 4],
    pub signature: [u8; 2],
}

const _: () = assert!(MBR_TABLE_OFFSET + core::mem::size_of::<Mbr>() == SECTOR_SIZE);

impl Mbr {
    #[inline]
    pub fn new_from_entries(entries: [MbrEntry; 4]) -> Self {
        Self {
            entries,
            signature: MBR_SIGNATURE,
        }
    }

    /// Table holding a single FAT32 LBA partition in entry 1.
    #[inline]
    pub fn new_fat32(start_lba: u32, sectors: u32) -> Self {
        let mut es = [MbrEntry::new_empty(); 4];
        es[0] = MbrEntry::new(0x00, 0x0C, start_lba, sectors);
        Self::new_from_entries(es)
    }

    /// Decodes the table from a loaded sector 0.
    pub fn from_sector(sector: &SectorBuf) -> PartResult<Self> {
        Self::read_from_bytes(&sector[MBR_TABLE_OFFSET..])
            .map_err(|_| PartError::Invalid("MBR: short table"))
    }

    /// Encodes the table into `sector`, leaving the boot code untouched.
    pub fn write_into(&self, sector: &mut SectorBuf) -> PartResult<()> {
        self.write_to(&mut sector[MBR_TABLE_OFFSET..])
            .map_err(|_| PartError::Invalid("MBR: short table"))
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == MBR_SIGNATURE
    }

    #[inline]
    pub fn first(&self) -> &MbrEntry {
        &self.entries[0]
    }

    #[inline]
    pub fn validate_header(&self) -> PartResult<()> {
        if !self.has_valid_signature() {
            return Err(PartError::BadSignature);
        }
        Ok(())
    }

    /// Returns `(start_lba, sectors)` of the FAT32 partition in entry 1.
    ///
    /// Only entry 1 is considered; data loggers are provisioned with a single
    /// partition.
    pub fn fat32_partition(&self) -> PartResult<(u32, u32)> {
        self.validate_header()?;
        let first = self.first();
        if !first.is_fat32_candidate() {
            log::debug!(
                "mbr: entry 1 rejected (flag={:#04x}, type={:#04x}, start={}, size={})",
                first.boot_flag,
                first.part_type,
                first.start_lba.get(),
                first.sectors.get()
            );
            return Err(PartError::NoPartition);
        }
        Ok((first.start_lba.get(), first.sectors.get()))
    }
}
