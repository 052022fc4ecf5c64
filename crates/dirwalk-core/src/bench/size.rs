/// Tree-size accumulation and human-readable formatting.
///
/// Several ways to add up the bytes under a directory, used to check that the
/// native and reference walkers saw exactly the same files. All sizes are
/// `u64` bytes; unreadable files count as zero.
use super::reference::{names_walk, std_walk, BaselineWalk};
use crate::listing::{list_dir, TypeHint};
use crate::walker::{Order, WalkDir};
use std::fs;
use std::path::Path;

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Sum of file sizes over the native walker's frames.
pub fn walk_tree_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .map(|frame| {
            frame
                .files
                .iter()
                .map(|name| file_len(&frame.path.join(name)))
                .sum::<u64>()
        })
        .sum()
}

/// Recursive sum straight off the listing, using the inline size where the
/// platform returns one and a metadata query otherwise.
///
/// Symbolic links to directories are not entered.
pub fn hinted_tree_size(root: &Path) -> u64 {
    let Ok(entries) = list_dir(root) else {
        return 0;
    };
    let mut total = 0;
    for entry in entries {
        let path = root.join(entry.name());
        let is_dir = match entry.hint() {
            TypeHint::Dir => true,
            TypeHint::NonDir => false,
            TypeHint::Unknown => fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false),
        };
        if is_dir {
            let is_link = entry.is_symlink_hint().unwrap_or_else(|| {
                fs::symlink_metadata(&path)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false)
            });
            if !is_link {
                total += hinted_tree_size(&path);
            }
        } else {
            total += entry.size_hint().unwrap_or_else(|| file_len(&path));
        }
    }
    total
}

fn baseline_size(root: &Path, walk: BaselineWalk) -> u64 {
    let mut total = 0;
    walk(
        root,
        Order::PreOrder,
        false,
        &mut |frame| {
            total += frame
                .files
                .iter()
                .map(|name| file_len(&frame.path.join(name)))
                .sum::<u64>();
        },
        &mut |_| {},
    );
    total
}

/// Sum of file sizes over the `std::fs` reference walker.
pub fn std_tree_size(root: &Path) -> u64 {
    baseline_size(root, std_walk)
}

/// Sum of file sizes over the names-only reference walker.
pub fn names_tree_size(root: &Path) -> u64 {
    baseline_size(root, names_walk)
}

/// Format a byte count into a human-readable string with appropriate unit.
///
/// Binary units (KiB = 1024) labelled with the common short forms.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else if b < TB {
        format!("{:.2} GB", b / GB)
    } else {
        format!("{:.2} TB", b / TB)
    }
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
