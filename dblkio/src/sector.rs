// SPDX-License-Identifier: MIT

use core::ops::{Deref, DerefMut};

use crate::{DblkIO, errors::*};

/// Physical sector size handled by the whole stack.
pub const SECTOR_SIZE: usize = 512;

/// Boot signature found at the end of MBR, boot and FSInfo sectors.
pub const BOOT_SIGNATURE: u16 = 0xAA55;
pub const BOOT_SIGNATURE_OFFSET: usize = 510;

#[inline(always)]
pub const fn sector_offset(lba: u32) -> u64 {
    lba as u64 * SECTOR_SIZE as u64
}

/// Owned scratch buffer for one physical sector.
///
/// Remembers which LBA its contents were loaded from. Callers that hand the
/// buffer to another helper must call [`SectorBuf::load`] again before
/// trusting its contents; `load` always goes to the device.
#[derive(Clone)]
pub struct SectorBuf {
    bytes: [u8; SECTOR_SIZE],
    lba: Option<u32>,
}

impl SectorBuf {
    pub const fn new() -> Self {
        Self {
            bytes: [0u8; SECTOR_SIZE],
            lba: None,
        }
    }

    /// Builds a detached buffer from raw bytes.
    pub const fn from_bytes(bytes: [u8; SECTOR_SIZE]) -> Self {
        Self { bytes, lba: None }
    }

    /// Reads sector `lba` from `io`, replacing the current contents.
    pub fn load<IO: DblkIO + ?Sized>(&mut self, io: &mut IO, lba: u32) -> DblkIOResult<&mut Self> {
        self.lba = None;
        io.read_at(sector_offset(lba), &mut self.bytes)?;
        self.lba = Some(lba);
        Ok(self)
    }

    /// Writes the buffer to sector `lba`.
    pub fn store<IO: DblkIO + ?Sized>(&mut self, io: &mut IO, lba: u32) -> DblkIOResult {
        io.write_at(sector_offset(lba), &self.bytes)?;
        self.lba = Some(lba);
        Ok(())
    }

    /// LBA the contents were last loaded from or stored to.
    #[inline]
    pub fn lba(&self) -> Option<u32> {
        self.lba
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.lba = None;
    }

    #[inline]
    pub fn has_boot_signature(&self) -> bool {
        self.u16_at(BOOT_SIGNATURE_OFFSET) == BOOT_SIGNATURE
    }

    #[inline]
    pub fn is_zeroed(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    #[inline]
    pub fn as_array(&self) -> &[u8; SECTOR_SIZE] {
        &self.bytes
    }

    crate::sector_impl_le_fields!(u16, u32);
}

impl Default for SectorBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SectorBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SectorBuf")
            .field("lba", &self.lba)
            .field("signature", &self.has_boot_signature())
            .finish()
    }
}

impl Deref for SectorBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for SectorBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

#[cfg(all(test, feature = "mem", feature = "std"))]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn load_tracks_lba_and_store_round_trips() {
        let mut disk = vec![0u8; SECTOR_SIZE * 4];
        let mut io = MemDblkIO::new(&mut disk);
        let mut buf = SectorBuf::new();

        buf.set_u32_at(0, 0xDEAD_BEEF);
        buf.set_u16_at(BOOT_SIGNATURE_OFFSET, BOOT_SIGNATURE);
        buf.store(&mut io, 2).unwrap();

        let mut other = SectorBuf::new();
        other.load(&mut io, 2).unwrap();
        assert_eq!(other.lba(), Some(2));
        assert_eq!(other.u32_at(0), 0xDEAD_BEEF);
        assert!(other.has_boot_signature());

        other.invalidate();
        assert_eq!(other.lba(), None);
    }

    #[test]
    fn failed_load_leaves_buffer_untagged() {
        let mut disk = vec![0u8; SECTOR_SIZE];
        let mut io = MemDblkIO::new(&mut disk);
        let mut buf = SectorBuf::new();
        buf.load(&mut io, 0).unwrap();
        assert!(buf.is_zeroed());

        assert_eq!(buf.load(&mut io, 1).unwrap_err(), DblkIOError::OutOfBounds);
        assert_eq!(buf.lba(), None);
    }
}
