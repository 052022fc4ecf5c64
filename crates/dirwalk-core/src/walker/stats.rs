/// Counters collected while a walk runs.
///
/// The interesting number is the query count: every entry the listing
/// could not classify inline costs one extra metadata system call, which is
/// exactly the overhead native enumeration exists to avoid.
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Directories whose listing session was opened.
    pub dirs_opened: u64,
    /// Frames produced.
    pub frames: u64,
    /// Entries seen across all listings.
    pub entries: u64,
    /// `is_dir` queries issued for entries without a type hint.
    pub type_queries: u64,
    /// `is_symlink` queries issued before descending.
    pub link_queries: u64,
    /// Errors reported (open, read and close failures).
    pub errors: u64,
    /// Directories skipped because they were already on the current path.
    pub loops_skipped: u64,
}

impl WalkStats {
    /// Total extra metadata calls beyond the listings themselves.
    pub fn extra_queries(&self) -> u64 {
        self.type_queries + self.link_queries
    }
}
