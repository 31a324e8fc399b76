//! Error type shared by the generators.
//!
//! Every variant that touches the filesystem carries the offending path so
//! the caller can log a useful message without extra bookkeeping.

use std::io;
use std::path::PathBuf;

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures.  Anything that makes a generator exit non-zero ends up as
/// one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reserving memory for a path or unit text failed.
    #[error("Out of memory while preparing {}", .path.display())]
    OutOfMemory { path: PathBuf },

    /// An output file was already present.  Generators never overwrite.
    #[error("Failed to create {}: file already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    /// Opening an output file failed for a reason other than it existing.
    #[error("Failed to create {}: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },

    /// Writing or flushing an output file failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Creating a `.wants/` (or similar) symlink failed.
    #[error("Failed to create symlink {}: {source}", .path.display())]
    Symlink { path: PathBuf, source: io::Error },

    /// An input file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// An input file could not be parsed.
    #[error("[{}:{line}] {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A directory listing failed.
    #[error("Failed to enumerate {}: {source}", .path.display())]
    Enumerate { path: PathBuf, source: io::Error },

    /// The cgroup membership of a process could not be determined.
    #[error("Failed to read cgroup membership from {}: {source}", .path.display())]
    Cgroup { path: PathBuf, source: io::Error },

    /// A `user-<uid>.slice` component did not carry a usable uid.
    #[error("Invalid owner uid in cgroup slice {slice}")]
    InvalidOwner { slice: String },

    /// Generator invoked with the wrong number of arguments.
    #[error("This program takes three or no arguments.")]
    Usage,
}

impl Error {
    /// The errno that best describes this error, for callers that want to
    /// report it the way the C generators do.
    pub fn errno(&self) -> i32 {
        match self {
            Error::OutOfMemory { .. } => libc::ENOMEM,
            Error::AlreadyExists { .. } => libc::EEXIST,
            Error::Create { source, .. }
            | Error::Write { source, .. }
            | Error::Symlink { source, .. }
            | Error::Read { source, .. }
            | Error::Enumerate { source, .. }
            | Error::Cgroup { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
            Error::Parse { .. } => libc::EBADMSG,
            Error::InvalidOwner { .. } => libc::EIO,
            Error::Usage => libc::EINVAL,
        }
    }
}
