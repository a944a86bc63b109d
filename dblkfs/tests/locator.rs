// SPDX-License-Identifier: MIT

mod common;

use common::*;
use dblkfs::fat32::constant::LOCATOR_OFFSET;
use dblkfs::fat32::locator::LOCATOR_SIZE;
use dblkfs::prelude::*;

fn provisioned(disk: &mut [u8]) -> VolumeLocator {
    let mut io = MemDblkIO::new(disk);
    let mut buf = SectorBuf::new();
    let mut fat = PseudoFat::initialize(&mut io, &mut buf).unwrap();
    let loc = VolumeLocator::new(
        fat.create_region("PANIC001", 64 * 1024).unwrap(),
        fat.create_region("CNFG0001", 8 * 1024).unwrap(),
        fat.create_region("DBLK0001", 0).unwrap(),
    );
    fat.write_locator(&loc).unwrap();
    assert_eq!(fat.read_locator().unwrap(), Some(loc));
    loc
}

fn locator_bytes(disk: &[u8], lba: u32) -> &[u8] {
    let at = lba as usize * SECTOR_SIZE + LOCATOR_OFFSET;
    &disk[at..at + LOCATOR_SIZE]
}

#[test]
fn written_to_boot_sector_and_backup() {
    let mut img = fat32_image();
    let pristine = img.clone();
    let loc = provisioned(&mut img);

    assert_eq!(locator_bytes(&img, 0), locator_bytes(&img, 6));
    assert_eq!(&locator_bytes(&img, 0)[..4], &0xDEED_BEAFu32.to_le_bytes());
    assert_eq!(&locator_bytes(&img, 0)[4..8], &loc.panic.start.to_le_bytes());

    // Only the locator bytes of the boot sector change.
    assert_eq!(img[..LOCATOR_OFFSET], pristine[..LOCATOR_OFFSET]);
    assert_eq!(
        img[LOCATOR_OFFSET + LOCATOR_SIZE..SECTOR_SIZE],
        pristine[LOCATOR_OFFSET + LOCATOR_SIZE..SECTOR_SIZE]
    );

    // The volume is still a valid FAT32 volume.
    let names: Vec<String> = fatfs_listing(&mut img).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["CNFG0001", "DBLK0001", "PANIC001"]);
}

#[test]
fn regions_do_not_overlap() {
    let mut img = fat32_image();
    let loc = provisioned(&mut img);
    assert!(!loc.panic.overlaps(&loc.config));
    assert!(!loc.config.overlaps(&loc.dblk));
    assert!(!loc.panic.overlaps(&loc.dblk));
    assert_eq!(loc.panic.len_bytes(), 64 * 1024);
    assert_eq!(loc.config.len_bytes(), 8 * 1024);
}

#[test]
fn mount_reads_only_the_boot_sector() {
    let mut img = fat32_image();
    let loc = provisioned(&mut img);

    let mut io = MemDblkIO::new(&mut img);
    let mut counter = IOCounter::new(&mut io);
    let mut buf = SectorBuf::new();
    assert_eq!(read_volume_locator(&mut counter, &mut buf).unwrap(), Some(loc));
    assert_eq!(counter.stats.reads, 1);
    assert_eq!(counter.stats.writes, 0);
}

#[test]
fn partitioned_locator_lives_at_the_partition_start() {
    let mut disk = partitioned_image();
    let mbr = disk[..SECTOR_SIZE].to_vec();
    let loc = provisioned(&mut disk);
    assert_eq!(&locator_bytes(&disk, PART_START)[..4], &0xDEED_BEAFu32.to_le_bytes());
    // The MBR sector, partition entries included, is left alone.
    assert_eq!(disk[..SECTOR_SIZE], mbr[..]);

    let mut io = MemDblkIO::new(&mut disk);
    let mut counter = IOCounter::new(&mut io);
    let mut buf = SectorBuf::new();
    assert_eq!(read_volume_locator(&mut counter, &mut buf).unwrap(), Some(loc));
    assert_eq!(counter.stats.reads, 2);
}

#[test]
fn damaged_primary_falls_back_to_backup() {
    let mut img = fat32_image();
    let loc = provisioned(&mut img);
    img[LOCATOR_OFFSET + 9] ^= 0x40;

    let mut io = MemDblkIO::new(&mut img);
    let mut buf = SectorBuf::new();
    assert_eq!(read_volume_locator(&mut io, &mut buf).unwrap(), Some(loc));

    let mut fat = PseudoFat::initialize(&mut io, &mut buf).unwrap();
    assert_eq!(fat.read_locator().unwrap(), Some(loc));
}

#[test]
fn damaged_copies_mean_no_locator() {
    let mut img = fat32_image();
    provisioned(&mut img);
    img[LOCATOR_OFFSET + 28] ^= 0x01;
    img[6 * SECTOR_SIZE + LOCATOR_OFFSET] ^= 0x01;

    let mut io = MemDblkIO::new(&mut img);
    let mut buf = SectorBuf::new();
    assert_eq!(read_volume_locator(&mut io, &mut buf).unwrap(), None);
}

#[test]
fn fresh_volume_has_no_locator() {
    let mut img = fat32_image();
    let mut io = MemDblkIO::new(&mut img);
    let mut buf = SectorBuf::new();
    let mut fat = PseudoFat::initialize(&mut io, &mut buf).unwrap();
    assert_eq!(fat.read_locator().unwrap(), None);
}

#[test]
fn unsigned_backup_is_left_alone() {
    let mut img = fat32_image();
    let backup = 6 * SECTOR_SIZE;
    img[backup..backup + SECTOR_SIZE].fill(0);
    provisioned(&mut img);
    assert!(img[backup..backup + SECTOR_SIZE].iter().all(|&b| b == 0));
}

#[test]
fn rewriting_replaces_the_whole_locator() {
    let mut img = fat32_image();
    let loc = provisioned(&mut img);
    let moved = VolumeLocator::new(loc.config, loc.panic, loc.dblk);

    let mut io = MemDblkIO::new(&mut img);
    let mut buf = SectorBuf::new();
    let mut fat = PseudoFat::initialize(&mut io, &mut buf).unwrap();
    fat.write_locator(&moved).unwrap();
    assert_eq!(fat.read_locator().unwrap(), Some(moved));
}
