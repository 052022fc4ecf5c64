/// Parallel contender using `jwalk` on a rayon pool.
///
/// The walkers in this crate are single-threaded, so this is not a
/// like-for-like comparison. It shows where a multi-core walk lands on the
/// same tree. Hidden entries are included and links are not followed.
use std::path::Path;
use tracing::debug;

fn walker(root: &Path) -> jwalk::WalkDir {
    jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
}

/// Number of directories visited, root included.
pub fn jwalk_dir_count(root: &Path) -> u64 {
    let mut dirs = 0;
    for entry in walker(root) {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs += 1,
            Ok(_) => {}
            Err(err) => debug!("jwalk: {err}"),
        }
    }
    dirs
}

/// Sum of file sizes, following file links. Links to directories are
/// skipped and entries that cannot be stat'ed count as zero.
pub fn jwalk_tree_size(root: &Path) -> u64 {
    let mut total = 0;
    for entry in walker(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("jwalk: {err}");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        // Links are reported unresolved; a link to a directory is not a file.
        match std::fs::metadata(entry.path()) {
            Ok(meta) if meta.is_dir() => {}
            Ok(meta) => total += meta.len(),
            Err(_) => {}
        }
    }
    total
}
