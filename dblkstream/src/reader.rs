// SPDX-License-Identifier: MIT

//! Sector stream reader and resync scan.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use dblkio::prelude::*;

use crate::{
    cursor::{StreamCursor, StreamState},
    errors::*,
    record::RecordFormat,
    sector::{SECTOR_PAYLOAD, SectorCheck, classify},
};

/// Consecutive checksum failures tolerated before giving up.
pub const RESYNC_MAX_BAD_SECTORS: u32 = 4;

/// Consecutive never-written sectors taken as the end of written data.
pub const MAX_EMPTY_SECTORS: u32 = 10;

/// Result of pulling one more sector into the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fetched {
    /// Expected sequence number; payload ready.
    Data,
    /// Valid sector, unexpected sequence number; adopted, payload ready.
    Gap,
    /// Checksum failure; payload discarded.
    Bad,
    /// All-zero sector; payload discarded.
    Empty,
}

/// Turns the sectors of one region into a byte stream.
///
/// The reader holds no position of its own: everything a pass needs is in
/// the [`StreamCursor`] handed to each call.
pub struct SectorStreamReader<'a, IO: DblkIO + ?Sized, F: RecordFormat> {
    io: &'a mut IO,
    format: F,
}

impl<'a, IO: DblkIO + ?Sized, F: RecordFormat> SectorStreamReader<'a, IO, F> {
    pub fn new(io: &'a mut IO, format: F) -> Self {
        Self { io, format }
    }

    #[inline]
    pub fn format(&self) -> &F {
        &self.format
    }

    /// Next logical byte of the stream.
    ///
    /// `Resynced` is a notice, not a loss of the read: calling again
    /// continues from the recovered position.
    pub fn next_byte(&mut self, cur: &mut StreamCursor) -> Result<u8, StreamEvent> {
        match cur.state {
            StreamState::Ended => return Err(StreamEvent::End),
            StreamState::Fatal(fault) => return Err(StreamEvent::Fatal(fault)),
            StreamState::Streaming | StreamState::Resyncing => {}
        }

        if let Some(b) = cur.pending.pop_front() {
            return Ok(b);
        }

        if cur.pos >= SECTOR_PAYLOAD {
            match self.fetch(cur)? {
                Fetched::Data => {}
                Fetched::Gap => {
                    cur.counters.resyncs += 1;
                    return Err(StreamEvent::Resynced(ResyncInfo {
                        cause: ResyncCause::Sequence,
                        at_landmark: false,
                        skipped: 0,
                    }));
                }
                Fetched::Bad => {
                    return Err(self.scan(
                        cur,
                        ResyncCause::Checksum,
                        VecDeque::new(),
                        SECTOR_PAYLOAD as u64,
                    ));
                }
                Fetched::Empty => {
                    return Err(self.scan(
                        cur,
                        ResyncCause::Empty,
                        VecDeque::new(),
                        SECTOR_PAYLOAD as u64,
                    ));
                }
            }
        }

        let b = cur.sector[cur.pos];
        cur.pos += 1;
        Ok(b)
    }

    /// Scans for the next landmark, first through `replay` (bytes the caller
    /// already pulled but could not use), then through the stream.
    ///
    /// On success the landmark is the next thing [`Self::next_byte`] returns.
    pub fn resync(&mut self, cur: &mut StreamCursor, replay: Vec<u8>) -> StreamEvent {
        match cur.state {
            StreamState::Ended => return StreamEvent::End,
            StreamState::Fatal(fault) => return StreamEvent::Fatal(fault),
            StreamState::Streaming | StreamState::Resyncing => {}
        }
        self.scan(cur, ResyncCause::Requested, VecDeque::from(replay), 0)
    }

    fn scan(
        &mut self,
        cur: &mut StreamCursor,
        cause: ResyncCause,
        mut src: VecDeque<u8>,
        mut skipped: u64,
    ) -> StreamEvent {
        let want = self.format.landmark_len();
        let mut window: VecDeque<u8> = VecDeque::with_capacity(want + 1);

        cur.state = StreamState::Resyncing;
        src.extend(cur.pending.drain(..));

        loop {
            let b = if let Some(b) = src.pop_front() {
                b
            } else if cur.pos < SECTOR_PAYLOAD {
                let b = cur.sector[cur.pos];
                cur.pos += 1;
                b
            } else {
                match self.fetch(cur) {
                    Ok(Fetched::Data | Fetched::Gap) => {}
                    Ok(Fetched::Bad | Fetched::Empty) => {
                        skipped += (window.len() + SECTOR_PAYLOAD) as u64;
                        window.clear();
                    }
                    Err(event) => {
                        skipped += window.len() as u64;
                        cur.counters.skipped_bytes += skipped;
                        log::warn!(
                            "[dblkstream] resync ({cause:?}) abandoned near lba {}: {event} ({skipped} bytes skipped)",
                            cur.next_lba
                        );
                        return event;
                    }
                }
                continue;
            };

            window.push_back(b);
            if window.len() > want {
                window.pop_front();
                skipped += 1;
            }
            if window.len() == want && self.format.is_landmark(window.make_contiguous()) {
                window.extend(src);
                cur.pending = window;
                cur.state = StreamState::Streaming;
                cur.counters.resyncs += 1;
                cur.counters.skipped_bytes += skipped;
                log::warn!(
                    "[dblkstream] resync ({cause:?}): {} landmark found before lba {}, {skipped} bytes skipped",
                    self.format.name(),
                    cur.next_lba
                );
                return StreamEvent::Resynced(ResyncInfo {
                    cause,
                    at_landmark: true,
                    skipped,
                });
            }
        }
    }

    /// Loads the next sector of the region into the cursor.
    ///
    /// Region end, read errors and exhausted retry budgets come back as
    /// the terminal event; the cursor state is updated to match.
    fn fetch(&mut self, cur: &mut StreamCursor) -> Result<Fetched, StreamEvent> {
        if cur.next_lba > cur.last_lba {
            cur.state = StreamState::Ended;
            return Err(StreamEvent::End);
        }

        let lba = cur.next_lba;
        if let Err(e) = cur.sector.load(&mut *self.io, lba) {
            let fault = StreamFault::IO(e);
            cur.state = StreamState::Fatal(fault);
            return Err(StreamEvent::Fatal(fault));
        }
        cur.next_lba += 1;
        cur.counters.sectors_read += 1;
        cur.pos = SECTOR_PAYLOAD;

        match classify(&cur.sector) {
            SectorCheck::Valid { seq } => {
                cur.bad_run = 0;
                cur.empty_run = 0;
                cur.pos = 0;
                let expected = cur.expected_seq;
                cur.expected_seq = seq.wrapping_add(1);
                if seq == expected {
                    Ok(Fetched::Data)
                } else {
                    cur.counters.sequence_gaps += 1;
                    log::warn!(
                        "[dblkstream] sequence gap at lba {lba}: expected {expected}, found {seq}"
                    );
                    Ok(Fetched::Gap)
                }
            }
            SectorCheck::BadChecksum { stored, computed } => {
                cur.bad_run += 1;
                cur.empty_run = 0;
                cur.counters.bad_sectors += 1;
                log::warn!(
                    "[dblkstream] bad sector at lba {lba} (stored {stored:#06x}, computed {computed:#06x})"
                );
                if cur.bad_run > RESYNC_MAX_BAD_SECTORS {
                    let fault = StreamFault::ResyncExhausted;
                    cur.state = StreamState::Fatal(fault);
                    return Err(StreamEvent::Fatal(fault));
                }
                Ok(Fetched::Bad)
            }
            SectorCheck::Empty => {
                cur.empty_run += 1;
                cur.counters.empty_sectors += 1;
                if cur.empty_run > MAX_EMPTY_SECTORS {
                    log::debug!("[dblkstream] end of written data before lba {lba}");
                    cur.state = StreamState::Ended;
                    return Err(StreamEvent::End);
                }
                Ok(Fetched::Empty)
            }
        }
    }
}
