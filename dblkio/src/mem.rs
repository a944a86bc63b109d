// SPDX-License-Identifier: MIT

use crate::{DblkIO, DblkIOError, DblkIOResult};

/// In-memory implementation of `DblkIO`.
///
/// Useful for tests and for provisioning images in RAM.
#[derive(Debug)]
pub struct MemDblkIO<'a> {
    buffer: &'a mut [u8],
}

impl<'a> MemDblkIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    #[inline]
    fn range(&self, offset: u64, len: usize) -> DblkIOResult<core::ops::Range<usize>> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(DblkIOError::OutOfBounds)?;
        if end > self.buffer.len() as u64 {
            return Err(DblkIOError::OutOfBounds);
        }
        Ok(offset as usize..end as usize)
    }
}

impl<'a> DblkIO for MemDblkIO<'a> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DblkIOResult {
        let range = self.range(offset, data.len())?;
        self.buffer[range].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DblkIOResult {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.buffer[range]);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> DblkIOResult {
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemDblkIO::new(&mut buf);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut buf = [0u8; 64];
        let mut io = MemDblkIO::new(&mut buf);
        assert_eq!(io.write_at(62, &[0; 4]), Err(DblkIOError::OutOfBounds));
        assert_eq!(io.read_at(u64::MAX, &mut [0; 1]), Err(DblkIOError::OutOfBounds));
    }

    #[test]
    fn test_le_primitives() {
        let mut buf = [0u8; 128];
        {
            let mut io = MemDblkIO::new(&mut buf);
            io.write_u32_at(64, 0x0403_0201).unwrap();
            assert_eq!(io.read_u16_at(66).unwrap(), 0x0403);
            assert_eq!(io.read_u64_at(124), Err(DblkIOError::OutOfBounds));
        }
        assert_eq!(&buf[64..68], &[1, 2, 3, 4]);
    }
}
