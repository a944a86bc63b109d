// SPDX-License-Identifier: MIT

use dblkfs::prelude::{DblkIO, Region};
use dblkstream::prelude::*;

use crate::layout::StreamFormat;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub stats: CodecStats,
    pub counters: StreamCounters,
    /// Set when the pass stopped on an unrecoverable stream fault.
    pub fault: Option<StreamFault>,
}

/// Decodes the record stream stored in `region`.
///
/// `visit` sees every record and every bad-record report in stream order;
/// returning `false` stops the pass early.
pub fn decode_region<IO, F>(
    io: &mut IO,
    region: Region,
    format: F,
    mut visit: impl FnMut(&RecordResult<Record>) -> bool,
) -> DumpSummary
where
    IO: DblkIO + ?Sized,
    F: RecordFormat,
{
    let reader = SectorStreamReader::new(io, format);
    let mut codec = RecordCodec::new(reader, StreamCursor::new(region.start, region.end));
    let mut fault = None;
    for item in codec.by_ref() {
        if let Err(RecordError::Fatal(f)) = &item {
            fault = Some(*f);
        }
        if !visit(&item) {
            break;
        }
    }
    let stats = *codec.stats();
    let counters = codec.into_cursor().counters;
    DumpSummary {
        stats,
        counters,
        fault,
    }
}

/// [`decode_region`] with the format picked by configuration.
pub fn decode_configured<IO: DblkIO + ?Sized>(
    io: &mut IO,
    region: Region,
    format: StreamFormat,
    visit: impl FnMut(&RecordResult<Record>) -> bool,
) -> DumpSummary {
    match format {
        StreamFormat::Device => decode_region(io, region, DeviceFormat, visit),
        StreamFormat::Legacy => decode_region(io, region, LegacyFormat, visit),
    }
}
