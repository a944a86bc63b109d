// SPDX-License-Identifier: MIT

use std::io::{Cursor, Seek, SeekFrom, Write};

use dblkfs::prelude::*;
use dblkgen::dump::decode_configured;
use dblkgen::{Layout, Role, StreamFormat, mount, provision, verify};
use dblkstream::prelude::{DeviceFormat, RecordFormat, pack_stream};
use dblkstream::record::device::{self, DeviceHeader, DeviceSync, seal_record};
use fatfs::{FatType, FileSystem, FormatVolumeOptions, FsOptions};
use zerocopy::IntoBytes;

const VOLUME_BYTES: usize = 40 * 1024 * 1024;

const LAYOUT: &str = r#"
    [[regions]]
    name = "PANIC001"
    role = "panic"
    size = "64K"

    [[regions]]
    name = "CNFG0001"
    role = "config"
    size = "8K"

    [[regions]]
    name = "DBLK0001"
    role = "dblk"
    size = "rest"
"#;

fn fat32_image() -> Vec<u8> {
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

fn listing(volume: &mut [u8]) -> Vec<(String, u64)> {
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

fn layout() -> Layout {
    LAYOUT.parse().unwrap()
}

#[test]
fn provision_then_mount() {
    let mut img = fat32_image();
    let layout = layout();

    let locator = {
        let mut io = MemDblkIO::new(&mut img);
        provision(&mut io, &layout).unwrap()
    };
    assert_eq!(locator.panic.len_bytes(), 64 * 1024);
    assert_eq!(locator.config.len_bytes(), 8 * 1024);
    assert!(locator.dblk.len_bytes() > 30 * 1024 * 1024);
    assert!(!locator.panic.overlaps(&locator.dblk));
    assert!(!locator.config.overlaps(&locator.dblk));

    // Mounting reads the boot sector and nothing else.
    let mut io = MemDblkIO::new(&mut img);
    let mut counter = IOCounter::new(&mut io);
    assert_eq!(mount(&mut counter).unwrap(), locator);
    assert_eq!(counter.stats.reads, 1);
    assert_eq!(counter.stats.writes, 0);

    let mut buf = SectorBuf::new();
    let mut fat = PseudoFat::initialize(&mut io, &mut buf).unwrap();
    assert_eq!(fat.find_region("DBLK0001").unwrap(), locator.dblk);
    assert_eq!(fat.find_region("PANIC001").unwrap(), locator.panic);

    verify(&mut io, &layout, &locator).unwrap();

    let files = listing(&mut img);
    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["CNFG0001", "DBLK0001", "PANIC001"]);
    assert!(files.contains(&("PANIC001".into(), 64 * 1024)));
    assert!(files.contains(&("CNFG0001".into(), 8 * 1024)));
}

#[test]
fn provisioning_twice_reuses_regions() {
    let mut img = fat32_image();
    let layout = layout();

    let mut io = MemDblkIO::new(&mut img);
    let first = provision(&mut io, &layout).unwrap();
    let second = provision(&mut io, &layout).unwrap();
    assert_eq!(first, second);

    assert_eq!(listing(&mut img).len(), 3);
}

#[test]
fn existing_region_too_small_is_refused() {
    let mut img = fat32_image();
    let mut io = MemDblkIO::new(&mut img);
    provision(&mut io, &layout()).unwrap();

    let bigger: Layout = LAYOUT.replace("\"64K\"", "\"256K\"").parse().unwrap();
    let err = provision(&mut io, &bigger).unwrap_err();
    assert!(err.to_string().contains("PANIC001"));
}

#[test]
fn invalid_layout_leaves_image_untouched() {
    let mut img = fat32_image();
    let pristine = img.clone();

    let mut layout = layout();
    layout.regions.retain(|r| r.role != Role::Config);
    let mut io = MemDblkIO::new(&mut img);
    assert!(provision(&mut io, &layout).is_err());
    assert!(img == pristine);
}

#[test]
fn unprovisioned_volume_does_not_mount() {
    let mut img = fat32_image();
    let mut io = MemDblkIO::new(&mut img);
    let err = mount(&mut io).unwrap_err();
    assert!(err.to_string().contains("no valid locator"));
}

#[test]
fn verify_detects_a_stale_locator() {
    let mut img = fat32_image();
    let layout = layout();
    let mut io = MemDblkIO::new(&mut img);
    let mut locator = provision(&mut io, &layout).unwrap();
    locator.config.start += 1;
    assert!(verify(&mut io, &layout, &locator).is_err());
}

#[test]
fn provision_through_a_file() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&fat32_image()).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let locator = {
        let mut io = StdDblkIO::new(&mut file);
        provision(&mut io, &Layout::default()).unwrap()
    };
    assert_eq!(locator.panic.len_bytes(), 128 * 1024);

    let mut io = StdDblkIO::new(&mut file);
    assert_eq!(mount(&mut io).unwrap(), locator);
}

#[test]
fn dump_records_written_into_dblk_region() {
    let mut img = fat32_image();
    let locator = {
        let mut io = MemDblkIO::new(&mut img);
        provision(&mut io, &layout()).unwrap()
    };

    let mut stream = Vec::new();
    let mut expected = Vec::new();
    for recnum in 1..=30u32 {
        let mut rec = if recnum % 10 == 1 {
            DeviceSync::new(device::DT_SYNC, recnum, 0).as_bytes().to_vec()
        } else {
            let mut rec = DeviceHeader::new(32, device::DT_NOTE, recnum)
                .as_bytes()
                .to_vec();
            rec.extend([recnum as u8; 12]);
            rec
        };
        seal_record(&mut rec);
        stream.extend(&rec);
        expected.push(recnum);
    }
    let packed = pack_stream(&stream, 0);
    let at = locator.dblk.start as usize * SECTOR_SIZE;
    img[at..at + packed.len()].copy_from_slice(&packed);

    let mut seen = Vec::new();
    let mut io = MemDblkIO::new(&mut img);
    let summary = decode_configured(&mut io, locator.dblk, StreamFormat::Device, |item| {
        if let Ok(record) = item {
            seen.extend(record.recnum);
        }
        true
    });
    assert_eq!(seen, expected);
    assert_eq!(summary.stats.records, 30);
    assert_eq!(summary.fault, None);
    assert!(DeviceFormat.is_landmark(&stream[..device::DEVICE_SYNC_LEN]));
}
