/// Native directory enumeration, the lowest layer of the crate.
///
/// Talks straight to the platform's directory-listing primitive instead of
/// going through `std::fs::read_dir`:
///
/// - **Unix:** `opendir` / `readdir` / `closedir` via `libc`. The entry type
///   comes from `d_type` when the filesystem fills it in.
/// - **Windows:** `FindFirstFileW` / `FindNextFileW` / `FindClose`. Every
///   step returns a `WIN32_FIND_DATAW` carrying attributes and size, so most
///   entries are classified without a second system call.
///
/// Both back-ends expose the same session shape (`open` → `next` → `close`)
/// through [`DirStream`]. The pseudo-entries `.` and `..` are never surfaced.
///
/// # Resource safety
///
/// A [`DirStream`] owns exactly one native handle. It is released by
/// [`DirStream::close`] or, if the stream is dropped first, by `Drop`,
/// never both, and never for a stream that failed to open.
#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod win32;

#[cfg(unix)]
use posix as sys;
#[cfg(windows)]
use win32 as sys;

use crate::error::{Error, Operation, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

/// Cheap classification returned inline by the native listing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    /// Known to be a directory.
    Dir,
    /// Known not to be a directory.
    NonDir,
    /// The listing did not say; a metadata query is needed.
    Unknown,
}

/// One entry produced by a listing, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: OsString,
    hint: TypeHint,
    symlink: Option<bool>,
    size: Option<u64>,
}

impl DirEntry {
    /// Create an entry with only a name and type hint.
    pub fn new(name: impl Into<OsString>, hint: TypeHint) -> Self {
        Self {
            name: name.into(),
            hint,
            symlink: None,
            size: None,
        }
    }

    /// Record whether the entry itself is a symbolic link.
    pub fn with_symlink(mut self, is_symlink: bool) -> Self {
        self.symlink = Some(is_symlink);
        self
    }

    /// Record the entry's byte length as reported by the listing.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// File name only (not the full path).
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Consume the entry, keeping only its name.
    pub fn into_name(self) -> OsString {
        self.name
    }

    pub fn hint(&self) -> TypeHint {
        self.hint
    }

    /// Whether the entry is a symbolic link, when the listing said so.
    pub fn is_symlink_hint(&self) -> Option<bool> {
        self.symlink
    }

    /// Byte length reported inline by the listing (Windows only, never for
    /// symbolic links).
    pub fn size_hint(&self) -> Option<u64> {
        self.size
    }
}

/// Identity of a directory on disk: (device or volume, inode or file index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId {
    pub device: u64,
    pub inode: u64,
}

/// An open enumeration session.
///
/// Implemented by [`DirStream`] and by test doubles.
pub trait EntryStream {
    /// Advance the session. `Ok(None)` means the listing is exhausted.
    fn next_entry(&mut self) -> Result<Option<DirEntry>>;

    /// Release the session. The resource counts as released even when this
    /// returns an error.
    fn close(self) -> Result<()>;
}

/// Source of enumeration sessions plus the classification queries a walk
/// falls back to when a listing gives no inline answer.
pub trait DirLister {
    type Stream: EntryStream;

    /// Open a session on `path`. A failed open owns nothing.
    fn open(&self, path: &Path) -> Result<Self::Stream>;

    /// Whether `path` is a directory, following symbolic links.
    /// Unreadable paths count as non-directories.
    fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    /// Whether `path` itself is a symbolic link.
    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    /// On-disk identity of the directory at `path`, following links.
    fn identity(&self, path: &Path) -> Option<DirId> {
        sys::dir_identity(path).ok()
    }
}

/// The production lister backed by the native platform API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLister;

impl DirLister for NativeLister {
    type Stream = DirStream;

    fn open(&self, path: &Path) -> Result<DirStream> {
        DirStream::open(path)
    }
}

/// A native enumeration session over one directory.
#[derive(Debug)]
pub struct DirStream {
    raw: sys::RawDir,
    failed: bool,
}

impl DirStream {
    /// Open a session on the directory at `path`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the directory does not exist, `PermissionDenied` when
    /// access is refused, `Os(code)` for anything else.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let raw = sys::RawDir::open(path.as_ref())?;
        Ok(Self { raw, failed: false })
    }

    /// Next entry in native order, or `Ok(None)` when exhausted.
    ///
    /// # Errors
    ///
    /// `Os(code)` (or a more specific kind) when the native advance fails.
    /// The stream must still be closed afterwards.
    pub fn next_entry(&mut self) -> Result<Option<DirEntry>> {
        self.raw.read()
    }

    /// Release the native handle.
    ///
    /// # Errors
    ///
    /// Returns the native release failure; the handle is released anyway.
    pub fn close(mut self) -> Result<()> {
        self.raw.close()
    }

    /// Path the session was opened on.
    pub fn path(&self) -> &Path {
        self.raw.path()
    }
}

impl EntryStream for DirStream {
    fn next_entry(&mut self) -> Result<Option<DirEntry>> {
        DirStream::next_entry(self)
    }

    fn close(self) -> Result<()> {
        DirStream::close(self)
    }
}

impl Iterator for DirStream {
    type Item = Result<DirEntry>;

    /// Yields entries until exhaustion or the first error, after which the
    /// iterator is fused.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.raw.read() {
            Ok(entry) => entry.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        if let Err(err) = self.raw.close() {
            tracing::warn!("releasing abandoned listing failed: {err}");
        }
    }
}

/// Drain a session to exhaustion and close it.
///
/// A read failure wins over a close failure; the session is closed in both
/// cases.
fn drain<S: EntryStream>(mut stream: S) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    let read = loop {
        match stream.next_entry() {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };
    let closed = stream.close();
    read?;
    closed?;
    Ok(entries)
}

/// List every entry of `path` with its inline hints.
///
/// # Errors
///
/// Any open, read or close failure.
pub fn list_dir(path: impl AsRef<Path>) -> Result<Vec<DirEntry>> {
    drain(DirStream::open(path)?)
}

/// List the entry names of `path`, like `std::fs::read_dir` without the
/// metadata plumbing.
///
/// # Errors
///
/// Any open, read or close failure.
pub fn read_names(path: impl AsRef<Path>) -> Result<Vec<OsString>> {
    Ok(list_dir(path)?
        .into_iter()
        .map(DirEntry::into_name)
        .collect())
}

/// Identity of the directory at `path`, following links.
///
/// # Errors
///
/// Fails with `Operation::Open` when the directory cannot be queried.
pub fn dir_identity(path: impl AsRef<Path>) -> Result<DirId> {
    let path = path.as_ref();
    sys::dir_identity(path).map_err(|err| Error::from_io(path, Operation::Open, &err))
}

/// `true` for the self and parent pseudo-entries.
#[cfg(unix)]
#[inline]
pub(crate) fn is_dot_entry(name: &[u8]) -> bool {
    name == b"." || name == b".."
}
