// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

// Core modules
pub mod errors;
mod macros;
pub mod sector;
pub mod stats;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::DblkIO;
    pub use super::DblkIOExt;
    pub use super::errors::*;
    pub use super::sector::*;
    pub use super::stats::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemDblkIO;

    #[cfg(feature = "std")]
    pub use super::std::StdDblkIO;
}

// Internal use
use errors::*;

// Traits

/// Block IO abstraction trait.
///
/// Allows read/write/flush at absolute byte offsets.
/// Implementations may target RAM, image files or raw block devices.
pub trait DblkIO {
    /// Writes `data` at `offset`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DblkIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DblkIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> DblkIOResult;
}

/// Little-endian primitive reads/writes (read_u16_at, write_u32_at, ...).
pub trait DblkIOExt: DblkIO {
    // Implements read/write helpers for primitive types (u16, u32, u64)
    dblkio_impl_primitive_rw!(u16, u32, u64);
}

impl<T: DblkIO + ?Sized> DblkIOExt for T {}
