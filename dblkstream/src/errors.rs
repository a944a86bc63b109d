// SPDX-License-Identifier: MIT

use alloc::vec::Vec;
use core::fmt;

pub use dblkio::errors::*;

/// Why the reader had to resynchronise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncCause {
    /// Valid sector with an unexpected sequence number.
    Sequence,
    /// Sector checksum did not match.
    Checksum,
    /// All-zero sector inside the written area.
    Empty,
    /// Caller-requested scan, e.g. after a bad record.
    Requested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncInfo {
    pub cause: ResyncCause,
    /// The next bytes returned start a landmark record.
    pub at_landmark: bool,
    /// Stream bytes dropped to get there.
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFault {
    IO(DblkIOError),
    ResyncExhausted,
}

impl StreamFault {
    pub fn msg(&self) -> &'static str {
        match self {
            StreamFault::IO(_) => "IO error",
            StreamFault::ResyncExhausted => "Too many consecutive bad sectors",
        }
    }

    pub fn source(&self) -> Option<DblkIOError> {
        match self {
            StreamFault::IO(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for StreamFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let Some(src) = self.source() {
            write!(f, "\n  caused by: {}", src.msg())?;
        }
        Ok(())
    }
}

/// Out-of-band outcome of [`crate::reader::SectorStreamReader::next_byte`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Resynced(ResyncInfo),
    End,
    Fatal(StreamFault),
}

impl StreamEvent {
    pub fn msg(&self) -> &'static str {
        match self {
            StreamEvent::Resynced(_) => "Stream resynchronised",
            StreamEvent::End => "End of stream",
            StreamEvent::Fatal(f) => f.msg(),
        }
    }
}

impl From<DblkIOError> for StreamEvent {
    fn from(e: DblkIOError) -> Self {
        StreamEvent::Fatal(StreamFault::IO(e))
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEvent::Resynced(info) => write!(
                f,
                "{} ({:?}, skipped {} bytes)",
                self.msg(),
                info.cause,
                info.skipped
            ),
            StreamEvent::Fatal(fault) => write!(f, "{fault}"),
            StreamEvent::End => write!(f, "{}", self.msg()),
        }
    }
}

/// Rule a record broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadReason {
    UnknownType(u16),
    TooShort { len: usize, min: usize },
    TooLong { len: usize, max: usize },
    LengthMismatch { len: usize, expected: usize },
    SubType(u8),
    Checksum { stored: u16, computed: u16 },
    ZeroRecnum,
}

impl BadReason {
    pub fn msg(&self) -> &'static str {
        match self {
            BadReason::UnknownType(_) => "Unknown record type",
            BadReason::TooShort { .. } => "Record shorter than its type allows",
            BadReason::TooLong { .. } => "Record longer than the format allows",
            BadReason::LengthMismatch { .. } => "Record length does not match its type",
            BadReason::SubType(_) => "Unknown record sub-type",
            BadReason::Checksum { .. } => "Record checksum mismatch",
            BadReason::ZeroRecnum => "Record number is zero",
        }
    }
}

impl fmt::Display for BadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            BadReason::UnknownType(t) => write!(f, " ({t})"),
            BadReason::TooShort { len, min } => write!(f, " (len: {len}, min: {min})"),
            BadReason::TooLong { len, max } => write!(f, " (len: {len}, max: {max})"),
            BadReason::LengthMismatch { len, expected } => {
                write!(f, " (len: {len}, expected: {expected})")
            }
            BadReason::SubType(s) => write!(f, " ({s})"),
            BadReason::Checksum { stored, computed } => {
                write!(f, " (stored: {stored:#06x}, computed: {computed:#06x})")
            }
            BadReason::ZeroRecnum => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Invalid record; `raw` holds every byte read for it.
    BadRecord { reason: BadReason, raw: Vec<u8> },
    End,
    Fatal(StreamFault),
}

impl RecordError {
    pub fn msg(&self) -> &'static str {
        match self {
            RecordError::BadRecord { reason, .. } => reason.msg(),
            RecordError::End => "End of stream",
            RecordError::Fatal(f) => f.msg(),
        }
    }

    /// Bad records are reported one at a time; the codec carries on after them.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecordError::BadRecord { .. })
    }
}

impl From<StreamFault> for RecordError {
    fn from(f: StreamFault) -> Self {
        RecordError::Fatal(f)
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::BadRecord { reason, raw } => {
                write!(f, "{reason} [{} bytes]", raw.len())
            }
            RecordError::End => write!(f, "{}", self.msg()),
            RecordError::Fatal(fault) => write!(f, "{fault}"),
        }
    }
}

pub type RecordResult<T> = Result<T, RecordError>;
