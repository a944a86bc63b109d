// SPDX-License-Identifier: MIT

use alloc::collections::VecDeque;

use dblkio::prelude::SectorBuf;

use crate::{errors::StreamFault, sector::SECTOR_PAYLOAD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    /// Looking for a landmark; only seen while a scan is in progress.
    Resyncing,
    /// Region exhausted or end of written data reached.
    Ended,
    Fatal(StreamFault),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamCounters {
    pub sectors_read: u64,
    pub bad_sectors: u64,
    pub empty_sectors: u64,
    pub sequence_gaps: u64,
    pub resyncs: u64,
    pub skipped_bytes: u64,
}

/// Everything one read pass over a region needs to remember.
///
/// Owned by the caller so several passes (or readers) can run side by side.
#[derive(Debug, Clone)]
pub struct StreamCursor {
    pub(crate) state: StreamState,
    pub(crate) next_lba: u32,
    pub(crate) last_lba: u32,
    pub(crate) expected_seq: u16,
    pub(crate) sector: SectorBuf,
    pub(crate) pos: usize,
    pub(crate) pending: VecDeque<u8>,
    pub(crate) bad_run: u32,
    pub(crate) empty_run: u32,
    pub counters: StreamCounters,
}

impl StreamCursor {
    /// Pass over sectors `first_lba..=last_lba`, expecting sequence 0 first.
    pub fn new(first_lba: u32, last_lba: u32) -> Self {
        Self::starting_at(first_lba, last_lba, 0)
    }

    /// Pass that starts mid-region with a known sequence number.
    pub fn starting_at(first_lba: u32, last_lba: u32, expected_seq: u16) -> Self {
        let state = if first_lba > last_lba {
            StreamState::Ended
        } else {
            StreamState::Streaming
        };
        Self {
            state,
            next_lba: first_lba,
            last_lba,
            expected_seq,
            sector: SectorBuf::new(),
            pos: SECTOR_PAYLOAD,
            pending: VecDeque::new(),
            bad_run: 0,
            empty_run: 0,
            counters: StreamCounters::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Sector the next fetch will read.
    #[inline]
    pub fn next_lba(&self) -> u32 {
        self.next_lba
    }

    #[inline]
    pub fn expected_seq(&self) -> u16 {
        self.expected_seq
    }

    /// Bytes still buffered before the next sector fetch.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.pending.len() + (SECTOR_PAYLOAD - self.pos)
    }
}
