//! Filesystem error classification
//!
//! Every failure while locating or opening a file ends here and is turned
//! into a response status plus a decision on whether it deserves an error
//! log line.

use hyper::StatusCode;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    Lstat,
    Open,
    Resolve,
}

impl FsOp {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Lstat => "lstat",
            Self::Open => "open",
            Self::Resolve => "resolve",
        }
    }
}

/// Failure of a single filesystem operation on a path
#[derive(Debug)]
pub struct FsError {
    pub op: FsOp,
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.op.as_str(), self.path.display(), self.source)
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Why a request could not be served
#[derive(Debug)]
pub enum ServeError {
    /// Outside the root, absent, or not a servable file type
    NotFound,
    /// Hidden behind a 404 but reported in the error log
    PermissionDenied(FsError),
    Internal(FsError),
}

impl ServeError {
    /// Classify an I/O failure of `op` on `path`
    pub fn from_io(op: FsOp, path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(FsError {
                op,
                path: path.to_path_buf(),
                source,
            }),
            _ => Self::Internal(FsError {
                op,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::PermissionDenied(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail for the error log, `None` when the failure is not worth reporting
    pub const fn detail(&self) -> Option<&FsError> {
        match self {
            Self::NotFound => None,
            Self::PermissionDenied(err) | Self::Internal(err) => Some(err),
        }
    }
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::PermissionDenied(err) | Self::Internal(err) => err.fmt(f),
        }
    }
}
