// SPDX-License-Identifier: MIT

use core::fmt;

use dblkio::prelude::*;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    errors::*,
    fat32::{constant::*, meta::Fat32Geometry},
};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fat32Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LFN       = 0x0F;
    }
}

/// Allowed characters in an 8.3 name (after uppercase).
#[inline(always)]
fn is_valid_sfn_char(b: u8) -> bool {
    matches!(b,
        b'A'..=b'Z' | b'0'..=b'9' |
        b'!' | b'$' | b'%' | b'\'' | b'-' | b'_' | b'@' | b'~' | b'`' |
        b'^' | b'#' | b'&' | b'(' | b')' | b'{' | b'}'
    )
}

/// Space-padded 8.3 name as stored in a directory entry.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ShortName(pub [u8; 11]);

impl ShortName {
    /// Parses `BASE[.EXT]`, uppercasing ASCII letters.
    ///
    /// Names that would need a long-name entry are rejected.
    pub fn parse(name: &str) -> FxResult<Self> {
        let (base, ext) = match name.rsplit_once('.') {
            Some((b, e)) => (b, e),
            None => (name, ""),
        };
        if base.is_empty() || base.len() > 8 || ext.len() > 3 {
            return Err(FxError::InvalidName);
        }
        let mut raw = [b' '; 11];
        for (dst, src) in raw[..8].iter_mut().zip(base.bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        for (dst, src) in raw[8..].iter_mut().zip(ext.bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        let used = base.len();
        if !raw[..used].iter().copied().all(is_valid_sfn_char)
            || !raw[8..8 + ext.len()].iter().copied().all(is_valid_sfn_char)
        {
            return Err(FxError::InvalidName);
        }
        Ok(Self(raw))
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.0[..8].trim_ascii_end();
        let ext = self.0[8..].trim_ascii_end();
        for &b in base {
            write!(f, "{}", b as char)?;
        }
        if !ext.is_empty() {
            write!(f, ".")?;
            for &b in ext {
                write!(f, "{}", b as char)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortName({self})")
    }
}

/// 32-byte short directory entry.
///
/// | off | field       | off | field    |
/// |-----|-------------|-----|----------|
/// | 0   | name        | 18  | adate    |
/// | 8   | ext         | 20  | start_hi |
/// | 11  | attr        | 22  | mtime    |
/// | 12  | nt_res      | 24  | mdate    |
/// | 13  | ctime_tenth | 26  | start_lo |
/// | 14  | ctime       | 28  | size     |
/// | 16  | cdate       |     |          |
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub attr: u8,
    pub nt_res: u8,
    pub ctime_tenth: u8,
    pub ctime: U16,
    pub cdate: U16,
    pub adate: U16,
    pub start_hi: U16,
    pub mtime: U16,
    pub mdate: U16,
    pub start_lo: U16,
    pub size: U32,
}

const _: () = assert!(core::mem::size_of::<DirEntry>() == FAT_DIR_ENTRY_SIZE);

impl DirEntry {
    /// Plain-file entry stamped with the current time (zero without `std`).
    pub fn new_file(name: ShortName, start_cluster: u32, size: u32) -> Self {
        let (date, time, tenth) = datetime_now();
        Self {
            name: name.0,
            attr: 0,
            nt_res: 0,
            ctime_tenth: tenth,
            ctime: U16::new(time),
            cdate: U16::new(date),
            adate: U16::new(date),
            start_hi: U16::new((start_cluster >> 16) as u16),
            mtime: U16::new(time),
            mdate: U16::new(date),
            start_lo: U16::new(start_cluster as u16),
            size: U32::new(size),
        }
    }

    #[inline]
    pub fn short_name(&self) -> ShortName {
        ShortName(self.name)
    }

    #[inline]
    pub fn first_cluster(&self) -> u32 {
        ((self.start_hi.get() as u32) << 16) | self.start_lo.get() as u32
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size.get()
    }

    #[inline]
    pub fn attributes(&self) -> Fat32Attributes {
        Fat32Attributes::from_bits_retain(self.attr)
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.name[0] == FAT_ENTRY_END_OF_DIR
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self.name[0], FAT_ENTRY_END_OF_DIR | FAT_ENTRY_DELETED)
    }

    #[inline]
    pub fn is_lfn(&self) -> bool {
        self.attr & FAT_LFN_ATTR_MASK == Fat32Attributes::LFN.bits()
    }

    /// A live entry that can name a region: not deleted, not a long-name
    /// fragment, not a volume label nor a directory.
    pub fn is_region_candidate(&self) -> bool {
        if self.is_free() || self.is_lfn() {
            return false;
        }
        !self
            .attributes()
            .intersects(Fat32Attributes::VOLUME_ID | Fat32Attributes::DIRECTORY)
    }
}

/// Location of one directory entry on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirSlot {
    pub lba: u32,
    pub index: usize,
}

impl DirSlot {
    #[inline]
    fn offset(&self) -> usize {
        self.index * FAT_DIR_ENTRY_SIZE
    }
}

/// Absolute sectors of a directory given its cluster chain.
pub fn dir_sectors<'c>(geo: &'c Fat32Geometry, clusters: &'c [u32]) -> impl Iterator<Item = u32> + 'c {
    clusters.iter().flat_map(move |&c| {
        let first = geo.cluster_to_sector(c);
        first..first + geo.sectors_per_cluster
    })
}

/// Walks the directory until `f` returns `Some` or the end marker is hit.
fn scan<IO, T, F>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    clusters: &[u32],
    mut f: F,
) -> FxResult<Option<T>>
where
    IO: DblkIO + ?Sized,
    F: FnMut(DirSlot, &DirEntry) -> Option<T>,
{
    for lba in dir_sectors(geo, clusters) {
        buf.load(io, lba)?;
        for index in 0..FAT_DIR_ENTRIES_PER_SECTOR {
            let slot = DirSlot { lba, index };
            let off = slot.offset();
            let entry = DirEntry::read_from_bytes(&buf[off..off + FAT_DIR_ENTRY_SIZE])
                .map_err(|_| FxError::Invalid("dir: short entry"))?;
            if let Some(found) = f(slot, &entry) {
                return Ok(Some(found));
            }
            if entry.is_end() {
                return Ok(None);
            }
        }
    }
    Ok(None)
}

/// Looks up a region entry by name.
pub fn find_entry<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    clusters: &[u32],
    name: &ShortName,
) -> FxResult<Option<(DirSlot, DirEntry)>> {
    scan(io, buf, geo, clusters, |slot, entry| {
        (entry.is_region_candidate() && entry.name == name.0).then_some((slot, *entry))
    })
}

/// First reusable slot (end marker or deleted entry).
pub fn find_free_slot<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    clusters: &[u32],
) -> FxResult<Option<DirSlot>> {
    scan(io, buf, geo, clusters, |slot, entry| entry.is_free().then_some(slot))
}

pub fn read_entry<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    slot: DirSlot,
) -> FxResult<DirEntry> {
    buf.load(io, slot.lba)?;
    let off = slot.offset();
    DirEntry::read_from_bytes(&buf[off..off + FAT_DIR_ENTRY_SIZE])
        .map_err(|_| FxError::Invalid("dir: short entry"))
}

/// Read-modify-write of one entry; the rest of the sector is untouched.
pub fn write_entry<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    slot: DirSlot,
    entry: &DirEntry,
) -> FxResult<()> {
    buf.load(io, slot.lba)?;
    let off = slot.offset();
    entry
        .write_to(&mut buf[off..off + FAT_DIR_ENTRY_SIZE])
        .map_err(|_| FxError::Invalid("dir: short entry"))?;
    buf.store(io, slot.lba)?;
    Ok(())
}

/// Packs a timestamp as FAT (date, time, tenths).
#[cfg(feature = "std")]
fn datetime_from(ts: time::OffsetDateTime) -> (u16, u16, u8) {
    let year = ts.year().clamp(1980, 2107);
    let month = ts.month() as u16;
    let day = ts.day() as u16;

    let hour = ts.hour() as u16;
    let minute = ts.minute() as u16;
    let second = ts.second() as u16;

    let tenth = (ts.millisecond() / 100) as u8 + (second % 2) as u8 * 10;

    let date = ((year - 1980) as u16) << 9 | (month << 5) | day;
    let time = (hour << 11) | (minute << 5) | (second / 2);

    (date, time, tenth)
}

#[cfg(feature = "std")]
fn datetime_now() -> (u16, u16, u8) {
    datetime_from(time::OffsetDateTime::now_utc())
}

#[cfg(not(feature = "std"))]
fn datetime_now() -> (u16, u16, u8) {
    (0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(&ShortName::parse("dblk0001").unwrap().0, b"DBLK0001   ");
        assert_eq!(&ShortName::parse("Panic.bin").unwrap().0, b"PANIC   BIN");
        assert_eq!(ShortName::parse("CNFG0001.x").unwrap().to_string(), "CNFG0001.X");
        for bad in ["", ".bin", "TOOLONGNAME", "A.LONG", "A B", "A+B", "é"] {
            assert_eq!(ShortName::parse(bad), Err(FxError::InvalidName), "{bad}");
        }
    }

    #[test]
    fn entry_fields() {
        let e = DirEntry::new_file(ShortName::parse("DBLK0001").unwrap(), 0x0012_3456, 4096);
        assert_eq!(e.first_cluster(), 0x0012_3456);
        assert_eq!(e.start_hi.get(), 0x0012);
        assert_eq!(e.size(), 4096);
        assert!(e.is_region_candidate());

        let bytes = e.as_bytes();
        assert_eq!(&bytes[0..11], b"DBLK0001   ");
        assert_eq!(bytes[11], 0);
        assert_eq!(&bytes[26..28], &[0x56, 0x34]);
        assert_eq!(&bytes[28..32], &4096u32.to_le_bytes());
    }

    #[test]
    fn skipped_entries() {
        let mut e = DirEntry::new_file(ShortName::parse("X").unwrap(), 3, 0);
        e.attr = 0x0F;
        assert!(e.is_lfn() && !e.is_region_candidate());
        e.attr = Fat32Attributes::VOLUME_ID.bits();
        assert!(!e.is_region_candidate());
        e.attr = Fat32Attributes::DIRECTORY.bits();
        assert!(!e.is_region_candidate());
        e.attr = Fat32Attributes::ARCHIVE.bits();
        assert!(e.is_region_candidate());
        e.name[0] = FAT_ENTRY_DELETED;
        assert!(e.is_free() && !e.is_region_candidate());
    }

    #[cfg(feature = "std")]
    #[test]
    fn fat_timestamps() {
        use time::macros::datetime;
        let (date, time, tenth) = datetime_from(datetime!(2024-03-15 13:45:31.250 UTC));
        assert_eq!(date, (44 << 9) | (3 << 5) | 15);
        assert_eq!(time, (13 << 11) | (45 << 5) | 15);
        assert_eq!(tenth, 12);

        let (date, _, _) = datetime_from(datetime!(1975-01-01 0:00 UTC));
        assert_eq!(date, (1 << 5) | 1);
    }
}
