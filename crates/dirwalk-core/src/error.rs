/// Uniform error model for directory enumeration and walking.
///
/// Both native back-ends report failures as a raw platform code (`errno` on
/// Unix, a Win32 error on Windows). Those codes are translated into one
/// small taxonomy so callers never branch on platform status values.
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors delivered to a walk's error handler.
///
/// Walk failures are enumeration failures attributed to the directory
/// that could not be listed, so the two share one type.
pub type WalkError = Error;

/// Which step of an enumeration session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Opening the session (`opendir` / `FindFirstFileW`).
    Open,
    /// Advancing to the next entry (`readdir` / `FindNextFileW`).
    Read,
    /// Releasing the session (`closedir` / `FindClose`).
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Read => "read",
            Self::Close => "close",
        })
    }
}

/// Failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The directory does not exist.
    NotFound,
    /// Access to the directory was refused.
    PermissionDenied,
    /// Any other native failure, carrying the raw platform code.
    Os(i32),
}

impl ErrorKind {
    /// Classify a raw platform error code.
    pub fn from_raw(code: i32) -> Self {
        match io::Error::from_raw_os_error(code).kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Os(code),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::PermissionDenied => f.write_str("permission denied"),
            Self::Os(0) => f.write_str("unknown failure"),
            Self::Os(code) => write!(f, "{}", io::Error::from_raw_os_error(*code)),
        }
    }
}

/// A failed enumeration step, attributed to the directory it concerned.
#[derive(Debug, thiserror::Error)]
#[error("cannot {op} directory {}: {kind}", .path.display())]
pub struct Error {
    path: PathBuf,
    op: Operation,
    kind: ErrorKind,
    code: i32,
}

impl Error {
    /// Build an error from a raw platform code.
    pub fn from_raw(path: impl Into<PathBuf>, op: Operation, code: i32) -> Self {
        Self {
            path: path.into(),
            op,
            kind: ErrorKind::from_raw(code),
            code,
        }
    }

    /// Build an error from the calling thread's last OS error.
    pub(crate) fn last_os_error(path: &Path, op: Operation) -> Self {
        let code = io::Error::last_os_error().raw_os_error().unwrap_or(0);
        Self::from_raw(path, op, code)
    }

    /// Build an error from a `std::io::Error`, falling back to a kind-only
    /// classification when it carries no raw code.
    pub fn from_io(path: impl Into<PathBuf>, op: Operation, err: &io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => Self::from_raw(path, op, code),
            None => {
                let kind = match err.kind() {
                    io::ErrorKind::NotFound => ErrorKind::NotFound,
                    io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                    _ => ErrorKind::Os(0),
                };
                Self {
                    path: path.into(),
                    op,
                    kind,
                    code: 0,
                }
            }
        }
    }

    /// The directory the failure is attributed to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The session step that failed.
    pub fn operation(&self) -> Operation {
        self.op
    }

    /// The uniform classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The untranslated platform code, `None` when there was none.
    pub fn raw_os_error(&self) -> Option<i32> {
        (self.code != 0).then_some(self.code)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
            ErrorKind::Os(_) => io::ErrorKind::Other,
        };
        match err.raw_os_error() {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::new(kind, err),
        }
    }
}
