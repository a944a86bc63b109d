// SPDX-License-Identifier: MIT

pub mod allocator;
pub mod boot;
pub mod constant;
pub mod dir;
pub mod fat;
pub mod locator;
pub mod meta;
pub mod region;

// === Public Interface ===
pub mod prelude {
    pub use super::allocator::{PseudoFat, locate_volume, read_volume_locator};
    pub use super::boot::Fat32BootSector;
    pub use super::dir::ShortName;
    pub use super::locator::VolumeLocator;
    pub use super::meta::Fat32Geometry;
    pub use super::region::{Region, RegionInfo};
    pub use crate::errors::*;
    pub use dblkio::prelude::*;
}
