// SPDX-License-Identifier: MIT

use core::fmt;

/// Unified error type for partition table handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartError {
    BadSignature,
    NoPartition,
    Invalid(&'static str),
}

impl PartError {
    pub fn msg(&self) -> &'static str {
        match self {
            PartError::BadSignature => "Missing 0xAA55 signature",
            PartError::NoPartition => "No FAT32 partition in entry 1",
            PartError::Invalid(msg) => msg,
        }
    }
}

impl From<&'static str> for PartError {
    fn from(s: &'static str) -> Self {
        PartError::Invalid(s)
    }
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg())
    }
}

pub type PartResult<T = ()> = Result<T, PartError>;
