// SPDX-License-Identifier: MIT

use dblkio::prelude::*;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{errors::*, fat32::constant::*};

/// FAT32 boot sector fields (BPB + extended BPB), bytes 0..90.
///
/// | off | field               | off | field              |
/// |-----|---------------------|-----|--------------------|
/// | 0   | jump_boot           | 36  | fat_size_32        |
/// | 3   | oem_name            | 40  | ext_flags          |
/// | 11  | bytes_per_sector    | 42  | fs_version         |
/// | 13  | sectors_per_cluster | 44  | root_cluster       |
/// | 14  | reserved_sectors    | 48  | fsinfo_sector      |
/// | 16  | num_fats            | 50  | backup_boot_sector |
/// | 17  | root_entry_count    | 52  | reserved           |
/// | 19  | total_sectors_16    | 64  | drive_number       |
/// | 21  | media               | 65  | reserved1          |
/// | 22  | fat_size_16         | 66  | boot_signature     |
/// | 24  | sectors_per_track   | 67  | volume_id          |
/// | 26  | num_heads           | 71  | volume_label       |
/// | 28  | hidden_sectors      | 82  | fs_type            |
/// | 32  | total_sectors_32    |     |                    |
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct Fat32BootSector {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: U16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: U16,
    pub num_fats: u8,
    pub root_entry_count: U16,
    pub total_sectors_16: U16,
    pub media: u8,
    pub fat_size_16: U16,
    pub sectors_per_track: U16,
    pub num_heads: U16,
    pub hidden_sectors: U32,
    pub total_sectors_32: U32,

    // FAT32 Extended BPB
    pub fat_size_32: U32,
    pub ext_flags: U16,
    pub fs_version: U16,
    pub root_cluster: U32,
    pub fsinfo_sector: U16,
    pub backup_boot_sector: U16,
    pub reserved: [u8; 12],

    pub drive_number: u8,
    pub reserved1: u8,
    pub boot_signature: u8,
    pub volume_id: U32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

pub const FAT32_BPB_SIZE: usize = 90;
const _: () = assert!(core::mem::size_of::<Fat32BootSector>() == FAT32_BPB_SIZE);

impl Fat32BootSector {
    /// Decodes the BPB of a loaded sector. The 0xAA55 signature is required.
    pub fn from_sector(sector: &SectorBuf) -> FxResult<Self> {
        if !sector.has_boot_signature() {
            return Err(FxError::BadBootSignature);
        }
        Self::read_from_bytes(&sector[..FAT32_BPB_SIZE])
            .map_err(|_| FxError::Invalid("boot sector: short BPB"))
    }

    /// Sanity check used to tell a FAT32 boot sector from an MBR.
    pub fn check(&self) -> Result<(), &'static str> {
        let spc = self.sectors_per_cluster;
        if self.bytes_per_sector.get() != FAT_SECTOR_SIZE {
            return Err("bytes per sector is not 512");
        }
        if spc == 0 || !spc.is_power_of_two() {
            return Err("bad sectors per cluster");
        }
        if self.reserved_sectors.get() == 0 {
            return Err("no reserved sectors");
        }
        if !matches!(self.num_fats, 1 | 2) {
            return Err("FAT count is not 1 or 2");
        }
        if self.root_entry_count.get() != 0
            || self.total_sectors_16.get() != 0
            || self.fat_size_16.get() != 0
        {
            return Err("FAT12/16 fields in use");
        }
        if self.fat_size_32.get() == 0 {
            return Err("zero FAT32 size");
        }
        if self.root_cluster.get() < FAT_FIRST_CLUSTER {
            return Err("bad root cluster");
        }
        if self.total_sectors_32.get() == 0 {
            return Err("zero total sectors");
        }
        Ok(())
    }

    #[inline]
    pub fn is_fat32(&self) -> bool {
        self.check().is_ok()
    }
}

/// FSInfo sector helpers; offsets are fixed by the FAT32 layout.
pub struct FsInfo;

impl FsInfo {
    /// All three FSInfo signatures are present.
    pub fn is_valid(sector: &SectorBuf) -> bool {
        sector.u32_at(FAT_FSINFO_LEAD_OFFSET) == FAT_FSINFO_LEAD_SIGNATURE
            && sector.u32_at(FAT_FSINFO_STRUCT_OFFSET) == FAT_FSINFO_STRUCT_SIGNATURE
            && sector.has_boot_signature()
    }

    #[inline]
    pub fn free_count(sector: &SectorBuf) -> u32 {
        sector.u32_at(FAT_FSINFO_FREE_COUNT_OFFSET)
    }

    #[inline]
    pub fn next_free(sector: &SectorBuf) -> u32 {
        sector.u32_at(FAT_FSINFO_NEXT_FREE_OFFSET)
    }

    /// Marks both hints as unknown so the next mounter recomputes them.
    pub fn invalidate_hints(sector: &mut SectorBuf) {
        sector.set_u32_at(FAT_FSINFO_FREE_COUNT_OFFSET, FAT_FSINFO_UNKNOWN);
        sector.set_u32_at(FAT_FSINFO_NEXT_FREE_OFFSET, FAT_FSINFO_UNKNOWN);
    }
}
