// SPDX-License-Identifier: MIT

//! Typed record codec on top of the sector stream.

use alloc::vec::Vec;

use dblkio::prelude::DblkIO;

use crate::{
    cursor::StreamCursor,
    errors::*,
    reader::SectorStreamReader,
    record::{Record, RecordFormat},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecStats {
    pub records: u64,
    pub bad_records: u64,
    /// Resync notices seen, requested or not.
    pub resyncs: u64,
    /// Stream bytes dropped by resyncs plus partial records abandoned.
    pub skipped_bytes: u64,
    /// Records whose parse started over after a resync.
    pub restarts: u64,
}

/// Why one parse attempt stopped.
enum Step {
    /// The stream moved under us; parse again from the new position.
    Restart,
    Failed(RecordError),
}

impl From<RecordError> for Step {
    fn from(e: RecordError) -> Self {
        Step::Failed(e)
    }
}

/// Pulls validated records out of a sector stream.
pub struct RecordCodec<'a, IO: DblkIO + ?Sized, F: RecordFormat> {
    reader: SectorStreamReader<'a, IO, F>,
    cursor: StreamCursor,
    /// Bytes to rescan before the stream; set after a bad record or an
    /// unanchored resync.
    retry: Option<Vec<u8>>,
    /// Alignment padding owed by the previous record.
    pad_due: usize,
    stats: CodecStats,
    done: bool,
}

impl<'a, IO: DblkIO + ?Sized, F: RecordFormat> RecordCodec<'a, IO, F> {
    pub fn new(reader: SectorStreamReader<'a, IO, F>, cursor: StreamCursor) -> Self {
        Self {
            reader,
            cursor,
            retry: None,
            pad_due: 0,
            stats: CodecStats::default(),
            done: false,
        }
    }

    #[inline]
    pub fn stats(&self) -> &CodecStats {
        &self.stats
    }

    #[inline]
    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    /// Gives the cursor back, e.g. to resume the pass later.
    pub fn into_cursor(self) -> StreamCursor {
        self.cursor
    }

    /// Next valid record.
    ///
    /// A `BadRecord` is reported once; the following call rescans from the
    /// byte after its first one.
    pub fn next_record(&mut self) -> RecordResult<Record> {
        loop {
            if let Some(replay) = self.retry.take() {
                match self.reader.resync(&mut self.cursor, replay) {
                    StreamEvent::Resynced(info) => {
                        self.stats.resyncs += 1;
                        self.stats.skipped_bytes += info.skipped;
                        self.pad_due = 0;
                    }
                    StreamEvent::End => return Err(RecordError::End),
                    StreamEvent::Fatal(fault) => return Err(RecordError::Fatal(fault)),
                }
            }

            match self.parse() {
                Ok(record) => return Ok(record),
                Err(Step::Restart) => self.stats.restarts += 1,
                Err(Step::Failed(RecordError::BadRecord { reason, raw })) => {
                    self.stats.bad_records += 1;
                    log::warn!(
                        "[dblkstream] bad {} record near lba {}: {reason}",
                        self.reader.format().name(),
                        self.cursor.next_lba()
                    );
                    self.retry = Some(raw.get(1..).unwrap_or_default().to_vec());
                    return Err(RecordError::BadRecord { reason, raw });
                }
                Err(Step::Failed(e)) => return Err(e),
            }
        }
    }

    fn parse(&mut self) -> Result<Record, Step> {
        let mut raw = Vec::new();
        while self.pad_due > 0 {
            self.pull(&mut raw)?;
            self.pad_due -= 1;
        }
        raw.clear();

        let header_len = self.reader.format().header_len();
        while raw.len() < header_len {
            self.pull(&mut raw)?;
        }

        let format = self.reader.format();
        let header = format.header(&raw);
        let Some(rule) = format.len_rule(header.dtype) else {
            return Err(bad(BadReason::UnknownType(header.dtype), raw));
        };
        if let Err(reason) = rule.check_declared(header.len) {
            return Err(bad(reason, raw));
        }
        let max = format.max_len();
        if header.len > max {
            return Err(bad(
                BadReason::TooLong {
                    len: header.len,
                    max,
                },
                raw,
            ));
        }

        raw.reserve(header.len - raw.len());
        while raw.len() < header.len {
            self.pull(&mut raw)?;
        }

        let format = self.reader.format();
        if let Err(reason) = rule.check_body(&raw).and_then(|_| format.verify(&raw)) {
            return Err(bad(reason, raw));
        }

        self.stats.records += 1;
        self.pad_due = format.padding(header.len);
        Ok(Record {
            dtype: header.dtype,
            name: format.type_name(header.dtype).unwrap_or("UNKNOWN"),
            recnum: format.recnum(&raw),
            bytes: raw,
        })
    }

    /// Appends one stream byte to `raw`.
    fn pull(&mut self, raw: &mut Vec<u8>) -> Result<(), Step> {
        match self.reader.next_byte(&mut self.cursor) {
            Ok(b) => {
                raw.push(b);
                Ok(())
            }
            Err(StreamEvent::Resynced(info)) => {
                self.stats.resyncs += 1;
                self.stats.skipped_bytes += info.skipped + raw.len() as u64;
                self.pad_due = 0;
                if !info.at_landmark {
                    // Stream continuity lost: the next record start is unknown.
                    self.retry = Some(Vec::new());
                }
                if !raw.is_empty() {
                    log::warn!(
                        "[dblkstream] {} bytes of a partial record dropped ({:?})",
                        raw.len(),
                        info.cause
                    );
                }
                Err(Step::Restart)
            }
            Err(StreamEvent::End) => Err(RecordError::End.into()),
            Err(StreamEvent::Fatal(fault)) => Err(RecordError::Fatal(fault).into()),
        }
    }
}

#[inline]
fn bad(reason: BadReason, raw: Vec<u8>) -> Step {
    Step::Failed(RecordError::BadRecord { reason, raw })
}

/// Yields records and bad-record reports; stops after `End` or the first
/// fatal error.
impl<IO: DblkIO + ?Sized, F: RecordFormat> Iterator for RecordCodec<'_, IO, F> {
    type Item = RecordResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Err(RecordError::End) => {
                self.done = true;
                None
            }
            Err(e @ RecordError::Fatal(_)) => {
                self.done = true;
                Some(Err(e))
            }
            other => Some(other),
        }
    }
}
