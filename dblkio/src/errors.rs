// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for DblkIO operations.
pub type DblkIOResult<T = ()> = core::result::Result<T, DblkIOError>;

/// Error type for DblkIO operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DblkIOError {
    Other(&'static str),
    Invalid(&'static str),
    OutOfBounds,
    Unsupported,
}

impl DblkIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            DblkIOError::Other(msg) => msg,
            DblkIOError::Invalid(msg) => msg,
            DblkIOError::OutOfBounds => "Out of bounds",
            DblkIOError::Unsupported => "Unsupported operation",
        }
    }
}

impl From<&'static str> for DblkIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        DblkIOError::Other(msg)
    }
}

impl fmt::Display for DblkIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}
