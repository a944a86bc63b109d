// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod codec;
pub mod cursor;
pub mod errors;
pub mod reader;
pub mod record;
pub mod sector;

pub mod prelude {
    pub use super::codec::{CodecStats, RecordCodec};
    pub use super::cursor::{StreamCounters, StreamCursor, StreamState};
    pub use super::errors::*;
    pub use super::reader::SectorStreamReader;
    pub use super::record::{
        DeviceFormat, LegacyFormat, LenRule, Record, RecordFormat, RecordHeader,
    };
    pub use super::sector::*;
}
