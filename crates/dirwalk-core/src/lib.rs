/// dirwalk core: native directory listing and the tree walker built on it.
///
/// No terminal or argument-parsing dependencies live here; the benchmark
/// binary in the workspace root is a thin front-end over [`bench`].
///
/// # Modules
///
/// - [`error`]: per-directory error type shared by every layer.
/// - [`listing`]: one-directory enumeration straight off the OS primitive.
/// - [`walker`]: lazy pre-/post-order tree walk yielding `(path, dirs, files)`.
/// - [`bench`]: fixture generation, reference walkers and timing harness.
pub mod bench;
pub mod error;
pub mod listing;
pub mod walker;

pub use error::{Error, ErrorKind, Operation, Result, WalkError};
pub use listing::{list_dir, read_names, DirEntry, DirStream, TypeHint};
pub use walker::{walk, Order, Walk, WalkDir, WalkFrame, WalkStats};
