// SPDX-License-Identifier: MIT

// === Disk Layout Parameters ===

pub const FAT_SECTOR_SIZE: u16 = 512; // BPB_BytsPerSec
pub const FAT32_MIN_CLUSTERS: u32 = 65525;
pub const FAT_VBR_BACKUP_SECTOR: u16 = 6;

// === FAT Region Parameters ===

pub const FAT_ENTRY_SIZE: usize = 4;
pub const FAT_ENTRIES_PER_SECTOR: u32 = (FAT_SECTOR_SIZE as usize / FAT_ENTRY_SIZE) as u32;
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const FAT_RESERVED_BITS: u32 = !FAT_ENTRY_MASK;
pub const FAT_FREE: u32 = 0;
pub const FAT_BAD: u32 = 0x0FFF_FFF7;
pub const FAT_EOC_MIN: u32 = 0x0FFF_FFF8;
pub const FAT_EOC: u32 = 0x0FFF_FFFF;
pub const FAT_FIRST_CLUSTER: u32 = 2;

// === FSINFO Constants ===

pub const FAT_FSINFO_LEAD_SIGNATURE: u32 = 0x4161_5252; // "RRaA"
pub const FAT_FSINFO_STRUCT_SIGNATURE: u32 = 0x6141_7272; // "rrAa"
pub const FAT_FSINFO_LEAD_OFFSET: usize = 0;
pub const FAT_FSINFO_STRUCT_OFFSET: usize = 484;
pub const FAT_FSINFO_FREE_COUNT_OFFSET: usize = 488;
pub const FAT_FSINFO_NEXT_FREE_OFFSET: usize = 492;
pub const FAT_FSINFO_UNKNOWN: u32 = 0xFFFF_FFFF;

// === Directory Entries ===

pub const FAT_DIR_ENTRY_SIZE: usize = 32;
pub const FAT_DIR_ENTRIES_PER_SECTOR: usize = FAT_SECTOR_SIZE as usize / FAT_DIR_ENTRY_SIZE;
pub const FAT_ENTRY_END_OF_DIR: u8 = 0x00;
pub const FAT_ENTRY_DELETED: u8 = 0xE5;
pub const FAT_LFN_ATTR_MASK: u8 = 0x3F;

// === Volume Locator ===

pub const LOCATOR_OFFSET: usize = 0x01A8;
pub const LOCATOR_SIGNATURE: u32 = 0xDEED_BEAF;
