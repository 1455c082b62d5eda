//! Error types for the repair pipeline.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while repairing a file
#[derive(Error, Debug)]
pub enum Error {
    /// A source or target was used outside its open scope
    #[error("{0} used outside of its open scope")]
    Usage(&'static str),

    /// External utility exited with a non-zero status
    #[error("'{program}' failed with {status}")]
    ToolFailed { program: String, status: ExitStatus },

    /// External utility did not finish in time and was killed
    #[error("'{program}' timed out after {}s", .timeout.as_secs())]
    ToolTimedOut { program: String, timeout: Duration },

    /// External utility could not be started at all
    #[error("failed to run '{program}': {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Every extraction fallback was exhausted
    #[error("unable to extract archive: {}", .0.display())]
    ExtractionImpossible(PathBuf),

    /// `content.xml` is missing and no sheet survived in the revision history
    #[error("'content.xml' is missing and failed to rebuild it from {}", .0.display())]
    UnrecoverableContent(PathBuf),

    /// ZIP structure could not be read or written
    #[error("invalid ZIP archive: {0}")]
    InvalidArchive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for `Err(Error::InvalidArchive(..))`, mirroring `anyhow::bail!`.
macro_rules! invalid {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::InvalidArchive(format!($($arg)*)))
    };
}

pub(crate) use invalid;
