/// Conventional walkers used as benchmark baselines.
///
/// Same ordering, symlink and error rules as [`crate::walker`], but every
/// entry is classified with a separate `stat` call the way a walker on top
/// of a names-only listing has to. Two flavours:
///
/// - [`names_walk`] lists with [`read_names`], the same native primitive the
///   walker uses, so the comparison isolates the cost of classification.
/// - [`std_walk`] lists with `std::fs::read_dir`.
use crate::error::{Operation, Result, WalkError};
use crate::listing::read_names;
use crate::walker::{Order, WalkFrame};
use std::ffi::OsString;
use std::fs;
use std::path::Path;

type ListNames<'a> = &'a dyn Fn(&Path) -> Result<Vec<OsString>>;

/// Signature shared by the baseline walkers.
pub type BaselineWalk =
    fn(&Path, Order, bool, &mut dyn FnMut(&WalkFrame), &mut dyn FnMut(WalkError));

fn std_names(path: &Path) -> Result<Vec<OsString>> {
    let read = fs::read_dir(path).map_err(|err| WalkError::from_io(path, Operation::Open, &err))?;
    read.map(|entry| {
        entry
            .map(|e| e.file_name())
            .map_err(|err| WalkError::from_io(path, Operation::Read, &err))
    })
    .collect()
}

fn walk_with(
    root: &Path,
    order: Order,
    follow_links: bool,
    list: ListNames<'_>,
    visit: &mut dyn FnMut(&WalkFrame),
    on_error: &mut dyn FnMut(WalkError),
) {
    let names = match list(root) {
        Ok(names) => names,
        Err(err) => {
            on_error(err);
            return;
        }
    };

    let mut frame = WalkFrame {
        path: root.to_path_buf(),
        dirs: Vec::new(),
        files: Vec::new(),
    };
    for name in names {
        let is_dir = fs::metadata(root.join(&name))
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            frame.dirs.push(name);
        } else {
            frame.files.push(name);
        }
    }

    if order == Order::PreOrder {
        visit(&frame);
    }
    for name in &frame.dirs {
        let path = root.join(name);
        let is_link = fs::symlink_metadata(&path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if follow_links || !is_link {
            walk_with(&path, order, follow_links, list, visit, on_error);
        }
    }
    if order == Order::PostOrder {
        visit(&frame);
    }
}

/// Walk `root` on top of `std::fs::read_dir`, calling `visit` for each
/// directory and `on_error` for each directory that could not be listed.
pub fn std_walk(
    root: &Path,
    order: Order,
    follow_links: bool,
    visit: &mut dyn FnMut(&WalkFrame),
    on_error: &mut dyn FnMut(WalkError),
) {
    walk_with(root, order, follow_links, &std_names, visit, on_error);
}

/// Walk `root` on top of the native names-only listing.
pub fn names_walk(
    root: &Path,
    order: Order,
    follow_links: bool,
    visit: &mut dyn FnMut(&WalkFrame),
    on_error: &mut dyn FnMut(WalkError),
) {
    walk_with(
        root,
        order,
        follow_links,
        &|path: &Path| read_names(path),
        visit,
        on_error,
    );
}

/// Every frame of a reference walk, in order. Errors are dropped.
pub fn std_frames(root: &Path, order: Order, follow_links: bool) -> Vec<WalkFrame> {
    let mut frames = Vec::new();
    std_walk(
        root,
        order,
        follow_links,
        &mut |frame| frames.push(frame.clone()),
        &mut |_| {},
    );
    frames
}
