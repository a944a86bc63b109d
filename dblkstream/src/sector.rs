// SPDX-License-Identifier: MIT

use alloc::vec::Vec;

use dblkio::prelude::*;

/// Stream bytes carried by one data sector.
pub const SECTOR_PAYLOAD: usize = 508;
pub const SECTOR_SEQ_OFFSET: usize = 508;
pub const SECTOR_CHECKSUM_OFFSET: usize = 510;

/// Wrapping u16 sum of payload and sequence bytes.
pub fn sector_checksum(bytes: &[u8]) -> u16 {
    bytes[..SECTOR_CHECKSUM_OFFSET]
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorCheck {
    Valid { seq: u16 },
    /// Never written (all zero).
    Empty,
    BadChecksum { stored: u16, computed: u16 },
}

/// Validates a loaded data sector.
pub fn classify(sector: &SectorBuf) -> SectorCheck {
    if sector.is_zeroed() {
        return SectorCheck::Empty;
    }
    let stored = sector.u16_at(SECTOR_CHECKSUM_OFFSET);
    let computed = sector_checksum(sector);
    if stored != computed {
        return SectorCheck::BadChecksum { stored, computed };
    }
    SectorCheck::Valid {
        seq: sector.u16_at(SECTOR_SEQ_OFFSET),
    }
}

/// Stamps `seq` and the checksum into a sector whose payload is filled.
pub fn seal_sector(sector: &mut SectorBuf, seq: u16) {
    sector.set_u16_at(SECTOR_SEQ_OFFSET, seq);
    let sum = sector_checksum(sector);
    sector.set_u16_at(SECTOR_CHECKSUM_OFFSET, sum);
}

/// Builds one data sector; a short payload is zero padded.
pub fn encode_sector(payload: &[u8], seq: u16) -> SectorBuf {
    let mut sector = SectorBuf::new();
    let n = payload.len().min(SECTOR_PAYLOAD);
    sector[..n].copy_from_slice(&payload[..n]);
    seal_sector(&mut sector, seq);
    sector
}

/// Splits `data` into consecutive sealed sectors starting at `first_seq`.
///
/// Mirrors what the device writer lays down in a dblk region; used by
/// tooling that fabricates or repairs streams.
pub fn pack_stream(data: &[u8], first_seq: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len().div_ceil(SECTOR_PAYLOAD) * SECTOR_SIZE);
    let mut seq = first_seq;
    for chunk in data.chunks(SECTOR_PAYLOAD) {
        out.extend_from_slice(encode_sector(chunk, seq).as_array());
        seq = seq.wrapping_add(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_sector_is_valid() {
        let s = encode_sector(&[0xFF; SECTOR_PAYLOAD], 0x1234);
        assert_eq!(classify(&s), SectorCheck::Valid { seq: 0x1234 });
        let expected = 0xFFu16.wrapping_mul(508).wrapping_add(0x12 + 0x34);
        assert_eq!(s.u16_at(SECTOR_CHECKSUM_OFFSET), expected);
    }

    #[test]
    fn damage_is_detected() {
        let mut s = encode_sector(b"hello", 7);
        s[3] ^= 0x10;
        assert!(matches!(classify(&s), SectorCheck::BadChecksum { .. }));

        let mut s = encode_sector(b"hello", 7);
        s[SECTOR_SEQ_OFFSET] = 8;
        assert!(matches!(classify(&s), SectorCheck::BadChecksum { .. }));

        assert_eq!(classify(&SectorBuf::new()), SectorCheck::Empty);
    }

    #[test]
    fn packing_wraps_sequence_numbers() {
        let data = vec![0xA5u8; SECTOR_PAYLOAD * 2 + 10];
        let disk = pack_stream(&data, u16::MAX);
        assert_eq!(disk.len(), 3 * SECTOR_SIZE);
        let seqs: Vec<u16> = disk
            .chunks(SECTOR_SIZE)
            .map(|s| u16::from_le_bytes([s[SECTOR_SEQ_OFFSET], s[SECTOR_SEQ_OFFSET + 1]]))
            .collect();
        assert_eq!(seqs, [u16::MAX, 0, 1]);
        assert!(disk[2 * SECTOR_SIZE + 10..2 * SECTOR_SIZE + SECTOR_PAYLOAD].iter().all(|&b| b == 0));
    }
}
