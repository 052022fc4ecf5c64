/// Synthetic benchmark tree.
///
/// Every directory gets `files` text files and, until `depth` runs out,
/// `dirs` subdirectories. File 0 in each directory is large (~900 KB) so
/// every level carries at least one big file; the rest grow linearly.
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// The line every fixture file is made of.
pub const LINE: &[u8] = b"The quick brown fox jumps over the lazy dog.\n";

/// Repeats of [`LINE`] in the first file of each directory.
const BIG_FILE_LINES: u64 = 20_000;

/// Shape of a generated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeShape {
    /// Levels of directories, counting the root.
    pub depth: u32,
    /// Subdirectories per directory.
    pub dirs: u32,
    /// Files per directory.
    pub files: u32,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            depth: 4,
            dirs: 5,
            files: 50,
        }
    }
}

impl TreeShape {
    /// Number of directories the shape produces, root included.
    pub fn dir_count(&self) -> u64 {
        let mut total = 1u64;
        let mut level = 1u64;
        for _ in 1..self.depth.max(1) {
            level *= u64::from(self.dirs);
            total += level;
        }
        total
    }

    /// Number of regular files the shape produces.
    pub fn file_count(&self) -> u64 {
        self.dir_count() * u64::from(self.files)
    }

    /// Exact byte total across all files.
    pub fn expected_bytes(&self) -> u64 {
        let lines: u64 = (0..u64::from(self.files)).map(file_lines).sum();
        self.dir_count() * lines * LINE.len() as u64
    }
}

fn file_lines(index: u64) -> u64 {
    if index == 0 {
        BIG_FILE_LINES
    } else {
        index * 10
    }
}

/// Create the tree rooted at `path`. `path` itself must not exist yet.
///
/// # Errors
///
/// Any directory creation or write failure.
pub fn create_tree(path: &Path, shape: &TreeShape) -> io::Result<()> {
    create_level(path, shape, shape.depth)
}

fn create_level(path: &Path, shape: &TreeShape, depth: u32) -> io::Result<()> {
    fs::create_dir(path)?;
    for i in 0..shape.files {
        let mut file = io::BufWriter::new(fs::File::create(path.join(format!("file{i:03}.txt")))?);
        for _ in 0..file_lines(u64::from(i)) {
            file.write_all(LINE)?;
        }
        file.flush()?;
    }
    if depth <= 1 {
        return Ok(());
    }
    for i in 0..shape.dirs {
        create_level(&path.join(format!("dir{i:03}")), shape, depth - 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_shape_counts() {
        let shape = TreeShape::default();
        assert_eq!(shape.dir_count(), 1 + 5 + 25 + 125);
        assert_eq!(shape.file_count(), 156 * 50);
    }

    #[test]
    fn flat_shape_has_one_dir() {
        let shape = TreeShape {
            depth: 1,
            dirs: 9,
            files: 2,
        };
        assert_eq!(shape.dir_count(), 1);
        assert_eq!(shape.expected_bytes(), (20_000 + 10) * LINE.len() as u64);
    }

    #[test]
    fn created_tree_matches_shape() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let root = tmp.path().join("tree");
        let shape = TreeShape {
            depth: 2,
            dirs: 2,
            files: 3,
        };
        create_tree(&root, &shape).unwrap();

        assert!(root.join("dir000").is_dir());
        assert!(root.join("dir001").join("file002.txt").is_file());
        assert!(!root.join("dir000").join("dir000").exists());

        let len = fs::metadata(root.join("file001.txt")).unwrap().len();
        assert_eq!(len, 10 * LINE.len() as u64);
    }

    #[test]
    fn existing_root_is_an_error() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        assert!(create_tree(tmp.path(), &TreeShape::default()).is_err());
    }
}
