// SPDX-License-Identifier: MIT

pub mod error;
pub mod layout;
pub mod size;

pub use error::*;
pub use layout::*;
pub use size::*;
