// SPDX-License-Identifier: MIT
#![allow(dead_code)]

use std::io::{Cursor, Read};

use dblkfs::prelude::*;
use dblkpart::Mbr;
use fatfs::{FatType, FileSystem, FormatVolumeOptions, FsOptions};

pub const VOLUME_BYTES: usize = 40 * 1024 * 1024;
pub const PART_START: u32 = 2048;

/// Bare FAT32 volume, 512-byte clusters, formatted by `fatfs`.
pub fn fat32_image() -> Vec<u8> {
    let mut img = vec![0u8; VOLUME_BYTES];
    fatfs::format_volume(
        &mut Cursor::new(&mut img[..]),
        FormatVolumeOptions::new()
            .fat_type(FatType::Fat32)
            .bytes_per_cluster(512),
    )
    .expect("format failed");
    img
}

/// Same volume behind a single-entry MBR at `PART_START`.
pub fn partitioned_image() -> Vec<u8> {
    let volume = fat32_image();
    let mut disk = vec![0u8; PART_START as usize * SECTOR_SIZE];
    disk.extend_from_slice(&volume);

    let mut sector = SectorBuf::new();
    Mbr::new_fat32(PART_START, (volume.len() / SECTOR_SIZE) as u32)
        .write_into(&mut sector)
        .expect("mbr encode failed");
    disk[..SECTOR_SIZE].copy_from_slice(sector.as_array());
    disk
}

/// Root directory as seen by an independent FAT implementation.
pub fn fatfs_listing(volume: &mut [u8]) -> Vec<(String, u64)> {
    let fs = FileSystem::new(Cursor::new(volume), FsOptions::new()).expect("fatfs mount failed");
    let mut out: Vec<(String, u64)> = fs
        .root_dir()
        .iter()
        .map(|e| e.expect("dir entry"))
        .filter(|e| e.is_file())
        .map(|e| (e.file_name(), e.len()))
        .collect();
    out.sort();
    out
}

/// File contents read through `fatfs`.
pub fn fatfs_read(volume: &mut [u8], name: &str) -> Vec<u8> {
    let fs = FileSystem::new(Cursor::new(volume), FsOptions::new()).expect("fatfs mount failed");
    let mut file = fs.root_dir().open_file(name).expect("open failed");
    let mut data = Vec::new();
    file.read_to_end(&mut data).expect("read failed");
    data
}

/// Fills every sector of `region` with its own LBA, little-endian, repeated.
pub fn stamp_region(disk: &mut [u8], region: Region) {
    for lba in region.start..=region.end {
        let off = lba as usize * SECTOR_SIZE;
        for word in disk[off..off + SECTOR_SIZE].chunks_exact_mut(4) {
            word.copy_from_slice(&lba.to_le_bytes());
        }
    }
}
