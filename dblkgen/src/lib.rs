// SPDX-License-Identifier: MIT

//! Layout-driven provisioning of dblk volumes.
//!
//! A [`Layout`] names the panic, config and dblk regions; [`provision`]
//! makes them exist on a FAT32 volume and records them in the volume
//! locator, [`mount`] reads them back, [`dump::decode_region`] walks the
//! record stream of a region.

pub mod dump;
pub mod layout;
pub mod provision;

pub use layout::*;
pub use provision::*;
