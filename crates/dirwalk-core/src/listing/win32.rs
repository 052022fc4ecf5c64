/// `FindFirstFileW` / `FindNextFileW` / `FindClose` back-end.
///
/// The find-data record filled by each call already carries the attributes
/// and the size of the entry, so directories, symlinks and file lengths are
/// known without opening anything else.
use super::{DirEntry, DirId, TypeHint};
use crate::error::{Error, Operation, Result};
use std::ffi::OsString;
use std::io;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{
    CloseHandle, ERROR_FILE_NOT_FOUND, ERROR_NO_MORE_FILES, HANDLE,
};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FindClose, FindFirstFileW, FindNextFileW, GetFileInformationByHandle,
    BY_HANDLE_FILE_INFORMATION, FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_REPARSE_POINT,
    FILE_FLAG_BACKUP_SEMANTICS, FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING, WIN32_FIND_DATAW,
};

// Reparse tag stored in dwReserved0 for symbolic links.
const IO_REPARSE_TAG_SYMLINK_VAL: u32 = 0xA000_000C;

/// An open find handle plus the record the next entry is read from.
///
/// `FindFirstFileW` already returns the first entry, so `pending` marks a
/// record that has been fetched but not yet surfaced.
pub(super) struct RawDir {
    handle: Option<HANDLE>,
    data: Box<WIN32_FIND_DATAW>,
    pending: bool,
    path: PathBuf,
}

impl std::fmt::Debug for RawDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDir")
            .field("open", &self.handle.is_some())
            .field("path", &self.path)
            .finish()
    }
}

impl RawDir {
    pub(super) fn open(path: &Path) -> Result<Self> {
        let pattern = search_pattern(path);
        let mut data: Box<WIN32_FIND_DATAW> = Box::default();

        match unsafe { FindFirstFileW(PCWSTR(pattern.as_ptr()), &mut *data) } {
            Ok(handle) => {
                tracing::trace!("opened {}", path.display());
                Ok(Self {
                    handle: Some(handle),
                    data,
                    pending: true,
                    path: path.to_path_buf(),
                })
            }
            // An existing directory with nothing matching the pattern: an
            // already-exhausted session that owns no handle.
            Err(e) if win32_code(&e) == ERROR_FILE_NOT_FOUND.0 => Ok(Self {
                handle: None,
                data,
                pending: false,
                path: path.to_path_buf(),
            }),
            Err(e) => Err(Error::from_raw(path, Operation::Open, win32_code(&e) as i32)),
        }
    }

    pub(super) fn read(&mut self) -> Result<Option<DirEntry>> {
        let Some(handle) = self.handle else {
            return Ok(None);
        };

        loop {
            if !self.pending {
                if let Err(e) = unsafe { FindNextFileW(handle, &mut *self.data) } {
                    let code = win32_code(&e);
                    if code == ERROR_NO_MORE_FILES.0 {
                        return Ok(None);
                    }
                    return Err(Error::from_raw(&self.path, Operation::Read, code as i32));
                }
            }
            self.pending = false;

            let wide = trim_nul(&self.data.cFileName);
            if is_dot_wide(wide) {
                continue;
            }
            let name = OsString::from_wide(wide);
            return Ok(Some(entry_from_find_data(name, &self.data)));
        }
    }

    /// Release the handle. Idempotent: later calls are no-ops.
    pub(super) fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.pending = false;
        unsafe { FindClose(handle) }
            .map_err(|e| Error::from_raw(&self.path, Operation::Close, win32_code(&e) as i32))
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// `path\*`, NUL-terminated. No separator is added after `\`, `/` or `:`.
fn search_pattern(path: &Path) -> Vec<u16> {
    let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
    if let Some(&last) = wide.last() {
        if last != u16::from(b'\\') && last != u16::from(b'/') && last != u16::from(b':') {
            wide.push(u16::from(b'\\'));
        }
        wide.push(u16::from(b'*'));
    }
    wide.push(0);
    wide
}

fn trim_nul(raw: &[u16]) -> &[u16] {
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    &raw[..len]
}

fn is_dot_wide(name: &[u16]) -> bool {
    const DOT: u16 = b'.' as u16;
    matches!(name, [DOT] | [DOT, DOT])
}

fn entry_from_find_data(name: OsString, data: &WIN32_FIND_DATAW) -> DirEntry {
    let attrs = data.dwFileAttributes;
    let is_symlink = attrs & FILE_ATTRIBUTE_REPARSE_POINT.0 != 0
        && data.dwReserved0 == IO_REPARSE_TAG_SYMLINK_VAL;
    // Attributes and size of a link describe the link, not its target.
    if is_symlink {
        return DirEntry::new(name, TypeHint::Unknown).with_symlink(true);
    }

    let hint = if attrs & FILE_ATTRIBUTE_DIRECTORY.0 != 0 {
        TypeHint::Dir
    } else {
        TypeHint::NonDir
    };
    let size = (u64::from(data.nFileSizeHigh) << 32) | u64::from(data.nFileSizeLow);

    DirEntry::new(name, hint)
        .with_symlink(false)
        .with_size(size)
}

/// Win32 error code carried by a `windows::core::Error`.
fn win32_code(err: &windows::core::Error) -> u32 {
    let hr = err.code().0 as u32;
    // HRESULT_FROM_WIN32 packs the code as 0x8007xxxx.
    if hr & 0xFFFF_0000 == 0x8007_0000 {
        hr & 0xFFFF
    } else {
        hr
    }
}

pub(super) fn dir_identity(path: &Path) -> io::Result<DirId> {
    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let handle = unsafe {
        CreateFileW(
            PCWSTR(wide.as_ptr()),
            0,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            None,
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS,
            None,
        )
    }
    .map_err(|e| io::Error::from_raw_os_error(win32_code(&e) as i32))?;

    let mut info = BY_HANDLE_FILE_INFORMATION::default();
    let queried = unsafe { GetFileInformationByHandle(handle, &mut info) };
    unsafe {
        let _ = CloseHandle(handle);
    }
    queried.map_err(|e| io::Error::from_raw_os_error(win32_code(&e) as i32))?;

    Ok(DirId {
        device: u64::from(info.dwVolumeSerialNumber),
        inode: (u64::from(info.nFileIndexHigh) << 32) | u64::from(info.nFileIndexLow),
    })
}
