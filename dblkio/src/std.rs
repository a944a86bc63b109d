// SPDX-License-Identifier: MIT

use std::io::{Error, Read, Seek, SeekFrom, Write};

use crate::{DblkIO, DblkIOError, DblkIOResult};

/// `DblkIO` over any seekable std stream (image file, raw device, cursor).
#[derive(Debug)]
pub struct StdDblkIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
}

impl<'a, T: Read + Write + Seek> StdDblkIO<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T) -> Self {
        Self { io }
    }
}

impl<'a, T: Read + Write + Seek> DblkIO for StdDblkIO<'a, T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DblkIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DblkIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> DblkIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl From<Error> for DblkIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => DblkIOError::OutOfBounds,
            std::io::ErrorKind::Unsupported => DblkIOError::Unsupported,
            _ => {
                // Leak the string to produce a 'static str. Acceptable for error mapping.
                let leaked_str: &'static str = Box::leak(e.to_string().into_boxed_str());
                DblkIOError::Other(leaked_str)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::*;
    use tempfile::tempfile;

    #[test]
    fn test_rw() {
        let mut file = tempfile().unwrap();
        let mut io = StdDblkIO::new(&mut file);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_short_read_is_out_of_bounds() {
        let mut file = tempfile().unwrap();
        let mut io = StdDblkIO::new(&mut file);
        io.write_at(0, &[0u8; 100]).unwrap();

        let mut buf = [0u8; SECTOR_SIZE];
        assert_eq!(io.read_at(0, &mut buf), Err(DblkIOError::OutOfBounds));
    }

    #[test]
    fn test_sector_buf_over_file() {
        let mut file = tempfile().unwrap();
        let mut io = StdDblkIO::new(&mut file);
        io.write_at(0, &[0u8; SECTOR_SIZE * 2]).unwrap();

        let mut sector = SectorBuf::new();
        sector.set_u16_at(BOOT_SIGNATURE_OFFSET, BOOT_SIGNATURE);
        sector.store(&mut io, 1).unwrap();
        io.flush().unwrap();

        let mut back = SectorBuf::new();
        back.load(&mut io, 1).unwrap();
        assert!(back.has_boot_signature());
        assert_eq!(io.read_u16_at(SECTOR_SIZE as u64 + 510).unwrap(), BOOT_SIGNATURE);
    }
}
