// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

pub mod errors;
pub mod mbr;

pub use errors::*;
pub use mbr::*;
