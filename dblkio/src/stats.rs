// SPDX-License-Identifier: MIT

use crate::{DblkIO, DblkIOResult, sector::SECTOR_SIZE};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,

    // Accesses that are not whole, aligned sectors
    pub unaligned_reads: u64,
    pub unaligned_writes: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

/// Transparent instrumentation wrapper.
pub struct IOCounter<'a, IO: DblkIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
}

impl<'a, IO: DblkIO + ?Sized> IOCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }

    #[inline]
    fn is_aligned(offset: u64, len: usize) -> bool {
        offset % SECTOR_SIZE as u64 == 0 && len % SECTOR_SIZE == 0
    }
}

impl<'a, IO: DblkIO + ?Sized> DblkIO for IOCounter<'a, IO> {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DblkIOResult {
        if !Self::is_aligned(offset, data.len()) {
            self.stats.unaligned_writes += 1;
        }
        self.stats.writes += 1;
        self.stats.write_bytes += data.len() as u64;
        self.inner.write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DblkIOResult {
        if !Self::is_aligned(offset, buf.len()) {
            self.stats.unaligned_reads += 1;
        }
        self.stats.reads += 1;
        self.stats.read_bytes += buf.len() as u64;
        self.inner.read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> DblkIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }
}

#[cfg(all(test, feature = "mem", feature = "std"))]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn counts_sector_and_byte_traffic() {
        let mut disk = vec![0u8; SECTOR_SIZE * 2];
        let mut mem = MemDblkIO::new(&mut disk);
        let mut io = IOCounter::new(&mut mem);

        let mut buf = SectorBuf::new();
        buf.load(&mut io, 1).unwrap();
        io.write_u32_at(4, 7).unwrap();
        io.flush().unwrap();

        let stats = io.snapshot();
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.read_bytes, SECTOR_SIZE as u64);
        assert_eq!(stats.unaligned_reads, 0);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.unaligned_writes, 1);
        assert_eq!(stats.flushes, 1);

        io.stats.reset();
        assert_eq!(io.snapshot(), IoStats::default());
    }
}
