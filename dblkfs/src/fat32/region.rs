// SPDX-License-Identifier: MIT

use dblkio::prelude::SECTOR_SIZE;

/// Contiguous sector range, both ends inclusive and absolute on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub start: u32,
    pub end: u32,
}

impl Region {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn sectors(&self) -> u32 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    #[inline]
    pub fn len_bytes(&self) -> u64 {
        self.sectors() as u64 * SECTOR_SIZE as u64
    }

    #[inline]
    pub fn contains(&self, lba: u32) -> bool {
        (self.start..=self.end).contains(&lba)
    }

    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A region together with the byte size recorded in its directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionInfo {
    pub region: Region,
    pub size: u32,
    pub first_cluster: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_bounds() {
        let r = Region::new(100, 227);
        assert_eq!(r.sectors(), 128);
        assert_eq!(r.len_bytes(), 64 * 1024);
        assert!(r.contains(100) && r.contains(227));
        assert!(!r.contains(228));
        assert!(r.overlaps(&Region::new(227, 300)));
        assert!(!r.overlaps(&Region::new(228, 300)));
    }
}
