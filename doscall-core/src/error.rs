//! Error types for DOS utility execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::filename::FilenameError;

/// Errors that can occur while preparing or running an emulator call.
#[derive(Error, Debug)]
pub enum DosError {
    #[error(transparent)]
    Filename(#[from] FilenameError),

    #[error("emulator timed out after {0} seconds")]
    Timeout(u64),

    #[error("failed to launch emulator: {0}")]
    Spawn(std::io::Error),

    #[error("mount directory does not exist: {}", .0.display())]
    MountDirMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for emulator call operations.
pub type DosResult<T> = Result<T, DosError>;
