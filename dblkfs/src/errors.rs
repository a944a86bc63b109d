// SPDX-License-Identifier: MIT

use core::fmt;

pub use dblkio::errors::*;
use dblkpart::PartError;

/// Error type of the pseudo-FAT allocator and the volume locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxError {
    IO(DblkIOError),

    // Structural
    BadBootSignature,
    NoPartition,
    SizeMismatch { partition: u32, volume: u32 },
    NotFat32 { clusters: u32 },

    // Allocation
    NotFound,
    Exists,
    NoRoom,
    RootDirFull,
    NotContiguous { cluster: u32 },
    InvalidCluster(u32),
    LoopDetected,
    InvalidName,
    InvalidSize,

    Invalid(&'static str),
}

impl FxError {
    pub fn msg(&self) -> &'static str {
        match self {
            FxError::IO(_) => "IO error",
            FxError::BadBootSignature => "Bad boot signature",
            FxError::NoPartition => "No FAT32 partition",
            FxError::SizeMismatch { .. } => "Partition size does not match volume size",
            FxError::NotFat32 { .. } => "Volume is not FAT32",
            FxError::NotFound => "Region not found",
            FxError::Exists => "Region already exists",
            FxError::NoRoom => "No contiguous run large enough",
            FxError::RootDirFull => "Root directory has no free entry",
            FxError::NotContiguous { .. } => "Cluster chain is not contiguous",
            FxError::InvalidCluster(_) => "Invalid cluster number",
            FxError::LoopDetected => "Loop detected in FAT chain",
            FxError::InvalidName => "Invalid 8.3 name",
            FxError::InvalidSize => "Invalid region size",
            FxError::Invalid(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<DblkIOError> {
        match self {
            FxError::IO(e) => Some(*e),
            _ => None,
        }
    }

    /// Allocation errors leave the volume untouched and can be retried
    /// with other parameters.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FxError::NotFound
                | FxError::Exists
                | FxError::NoRoom
                | FxError::RootDirFull
                | FxError::InvalidName
                | FxError::InvalidSize
        )
    }
}

impl From<DblkIOError> for FxError {
    fn from(e: DblkIOError) -> Self {
        FxError::IO(e)
    }
}

impl From<PartError> for FxError {
    fn from(e: PartError) -> Self {
        match e {
            PartError::BadSignature => FxError::BadBootSignature,
            PartError::NoPartition => FxError::NoPartition,
            PartError::Invalid(msg) => FxError::Invalid(msg),
        }
    }
}

impl From<&'static str> for FxError {
    fn from(msg: &'static str) -> Self {
        FxError::Invalid(msg)
    }
}

impl fmt::Display for FxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            FxError::SizeMismatch { partition, volume } => {
                write!(f, " (partition: {partition}, volume: {volume})")?
            }
            FxError::NotFat32 { clusters } => write!(f, " (clusters: {clusters})")?,
            FxError::NotContiguous { cluster } | FxError::InvalidCluster(cluster) => {
                write!(f, " (cluster: {cluster})")?
            }
            _ => {}
        }
        if let Some(src) = self.source() {
            write!(f, "\n  caused by: {}", src.msg())?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FxError {}

pub type FxResult<T = ()> = Result<T, FxError>;
