// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod errors;
pub mod fat32;

/// Contiguous region allocator and volume locator.
///
/// See [`fat32::allocator::PseudoFat`] and [`fat32::locator::VolumeLocator`].
pub mod prelude {
    pub use super::fat32::prelude::*;
}
