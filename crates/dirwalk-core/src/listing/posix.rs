/// `opendir` / `readdir` / `closedir` back-end.
///
/// The `dirent` returned by `readdir` lives in a buffer owned by the `DIR`
/// stream and is overwritten by the next call, so each entry's name is
/// copied out before the stream is advanced again.
use super::{is_dot_entry, DirEntry, DirId, TypeHint};
use crate::error::{Error, Operation, Result};
use std::ffi::{CStr, CString, OsStr};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// An open `DIR*` stream. `dir` is `None` once released.
#[derive(Debug)]
pub(super) struct RawDir {
    dir: Option<NonNull<libc::DIR>>,
    path: PathBuf,
}

impl RawDir {
    pub(super) fn open(path: &Path) -> Result<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| Error::from_raw(path, Operation::Open, libc::EINVAL))?;

        let ptr = unsafe { libc::opendir(c_path.as_ptr()) };
        match NonNull::new(ptr) {
            Some(dir) => {
                tracing::trace!("opened {}", path.display());
                Ok(Self {
                    dir: Some(dir),
                    path: path.to_path_buf(),
                })
            }
            None => Err(Error::last_os_error(path, Operation::Open)),
        }
    }

    pub(super) fn read(&mut self) -> Result<Option<DirEntry>> {
        let Some(dir) = self.dir else {
            return Ok(None);
        };

        loop {
            // readdir returns NULL both at the end and on failure; only errno
            // tells them apart.
            clear_errno();
            let ent = unsafe { libc::readdir(dir.as_ptr()) };
            if ent.is_null() {
                return match io::Error::last_os_error().raw_os_error() {
                    None | Some(0) => Ok(None),
                    Some(code) => Err(Error::from_raw(&self.path, Operation::Read, code)),
                };
            }

            let ent = unsafe { &*ent };
            let name = unsafe { CStr::from_ptr(ent.d_name.as_ptr()) }.to_bytes();
            if is_dot_entry(name) {
                continue;
            }

            let entry = DirEntry::new(OsStr::from_bytes(name), TypeHint::Unknown);
            return Ok(Some(apply_d_type(entry, ent)));
        }
    }

    /// Release the stream. Idempotent: later calls are no-ops.
    pub(super) fn close(&mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        if unsafe { libc::closedir(dir.as_ptr()) } != 0 {
            return Err(Error::last_os_error(&self.path, Operation::Close));
        }
        Ok(())
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// Fill the type hint and symlink flag from `d_type`.
///
/// `DT_LNK` says nothing about the target, so the hint stays `Unknown` and a
/// follow-up `stat` decides whether the link points at a directory.
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly",
))]
fn apply_d_type(entry: DirEntry, ent: &libc::dirent) -> DirEntry {
    match ent.d_type {
        libc::DT_DIR => DirEntry {
            hint: TypeHint::Dir,
            ..entry
        }
        .with_symlink(false),
        libc::DT_LNK => entry.with_symlink(true),
        libc::DT_UNKNOWN => entry,
        _ => DirEntry {
            hint: TypeHint::NonDir,
            ..entry
        }
        .with_symlink(false),
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly",
)))]
fn apply_d_type(entry: DirEntry, _ent: &libc::dirent) -> DirEntry {
    entry
}

#[cfg(any(target_os = "linux", target_os = "emscripten"))]
fn clear_errno() {
    unsafe { *libc::__errno_location() = 0 }
}

#[cfg(any(target_os = "android", target_os = "openbsd", target_os = "netbsd"))]
fn clear_errno() {
    unsafe { *libc::__errno() = 0 }
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn clear_errno() {
    unsafe { *libc::__error() = 0 }
}

// No portable errno accessor elsewhere; a stale value can surface as a
// spurious read error at end of stream.
#[cfg(not(any(
    target_os = "linux",
    target_os = "emscripten",
    target_os = "android",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
)))]
fn clear_errno() {}

pub(super) fn dir_identity(path: &Path) -> io::Result<DirId> {
    let meta = std::fs::metadata(path)?;
    Ok(DirId {
        device: meta.dev(),
        inode: meta.ino(),
    })
}
