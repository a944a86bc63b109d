// SPDX-License-Identifier: MIT

use core::fmt;

use crate::layout::Role;

/// Semantic layout problems; syntax errors come from `toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    MissingRole(Role),
    DuplicateRole(Role),
    DuplicateName(String),
    InvalidName(String),
    RestNotLast(String),
    ZeroSize(String),
    SizeTooLarge(String, u64),
    UnknownFormat(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::MissingRole(role) => write!(f, "No region with role '{role}'"),
            LayoutError::DuplicateRole(role) => {
                write!(f, "More than one region with role '{role}'")
            }
            LayoutError::DuplicateName(name) => write!(f, "Region name '{name}' used twice"),
            LayoutError::InvalidName(name) => {
                write!(f, "Region name '{name}' is not a valid 8.3 name")
            }
            LayoutError::RestNotLast(name) => {
                write!(f, "Region '{name}' uses size = 'rest' but is not the last region")
            }
            LayoutError::ZeroSize(name) => write!(f, "Region '{name}' has a zero size"),
            LayoutError::SizeTooLarge(name, size) => {
                write!(f, "Region '{name}' size {size} exceeds the 4 GiB file limit")
            }
            LayoutError::UnknownFormat(name) => {
                write!(f, "Unknown stream format '{name}' (expected 'device' or 'legacy')")
            }
        }
    }
}

impl std::error::Error for LayoutError {}
