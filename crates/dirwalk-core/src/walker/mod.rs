/// Recursive tree walker built on the native listing layer.
///
/// Produces one [`WalkFrame`] `(path, dirs, files)` per visited
/// directory, with the ordering and symlink semantics of the conventional
/// top-down / bottom-up directory walker.
///
/// # Laziness
///
/// [`Walk`] is an explicit stack machine: each call to `next` lists at most
/// the directories needed to produce one frame. A directory's session is
/// opened, drained and closed before its frame is returned, so no session
/// is ever open between two frames and abandoning the iterator leaks
/// nothing.
///
/// # Pruning
///
/// [`Walk::next_frame`] lends the frame mutably. In pre-order the caller may
/// edit `dirs` before asking for the next frame and the edited list decides
/// which subdirectories are entered, and in which order. Edits in post-order
/// have no effect because the subdirectories were already visited.
///
/// # Symlink loops
///
/// With `follow_links` enabled, a directory whose identity matches one of
/// its ancestors on the current path is skipped, so cyclic links terminate.
pub mod stats;

pub use stats::WalkStats;

use crate::error::WalkError;
use crate::listing::{DirEntry, DirId, DirLister, EntryStream, NativeLister, TypeHint};
use std::collections::HashMap;
use std::ffi::OsString;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Callback receiving per-directory failures.
pub type ErrorHandler = Box<dyn FnMut(WalkError)>;

/// When a directory's frame is produced relative to its descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Parent before children.
    #[default]
    PreOrder,
    /// Children before parent.
    PostOrder,
}

/// One visited directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkFrame {
    pub path: PathBuf,
    /// Names of subdirectories (including symlinks to directories).
    pub dirs: Vec<OsString>,
    /// Names of everything else.
    pub files: Vec<OsString>,
}

/// Walk configuration, consumed into a [`Walk`] by `into_iter`.
pub struct WalkDir<L: DirLister = NativeLister> {
    root: PathBuf,
    order: Order,
    follow_links: bool,
    on_error: Option<ErrorHandler>,
    lister: L,
}

impl WalkDir<NativeLister> {
    /// Walk `root` in pre-order, not following links, ignoring errors.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            order: Order::PreOrder,
            follow_links: false,
            on_error: None,
            lister: NativeLister,
        }
    }
}

impl<L: DirLister> WalkDir<L> {
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Descend into symbolic links to directories.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Receive failures instead of silently skipping the directory.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnMut(WalkError) + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Swap the listing back-end.
    pub fn lister<M: DirLister>(self, lister: M) -> WalkDir<M> {
        WalkDir {
            root: self.root,
            order: self.order,
            follow_links: self.follow_links,
            on_error: self.on_error,
            lister,
        }
    }
}

impl<L: DirLister> IntoIterator for WalkDir<L> {
    type Item = WalkFrame;
    type IntoIter = Walk<L>;

    fn into_iter(self) -> Walk<L> {
        Walk {
            lister: self.lister,
            order: self.order,
            follow_links: self.follow_links,
            on_error: self.on_error,
            root: Some(self.root),
            stack: Vec::new(),
            held: None,
            stats: WalkStats::default(),
        }
    }
}

/// Walk `root` with every knob explicit.
pub fn walk(
    root: impl AsRef<Path>,
    order: Order,
    follow_links: bool,
    on_error: Option<ErrorHandler>,
) -> Walk {
    let mut walker = WalkDir::new(root).order(order).follow_links(follow_links);
    walker.on_error = on_error;
    walker.into_iter()
}

/// A directory on the current path whose children are still being visited.
struct Pending {
    id: Option<DirId>,
    children: std::vec::IntoIter<PathBuf>,
    /// Post-order frame waiting for its descendants.
    frame: Option<WalkFrame>,
}

/// A listed directory plus what descent needs to know about it.
struct Listing {
    frame: WalkFrame,
    id: Option<DirId>,
    /// Link-ness of subdirectory entries, where the listing said.
    links: HashMap<OsString, bool>,
}

/// The lazy walk itself.
pub struct Walk<L: DirLister = NativeLister> {
    lister: L,
    order: Order,
    follow_links: bool,
    on_error: Option<ErrorHandler>,
    root: Option<PathBuf>,
    stack: Vec<Pending>,
    /// Pre-order frame lent out by `next_frame`, descended on the next call.
    held: Option<Listing>,
    stats: WalkStats,
}

impl<L: DirLister> Walk<L> {
    /// Next frame, lent mutably so `dirs` can be pruned before descent.
    pub fn next_frame(&mut self) -> Option<&mut WalkFrame> {
        self.release_held();
        let listing = self.step()?;
        Some(&mut self.held.insert(listing).frame)
    }

    /// Counters so far.
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    fn release_held(&mut self) {
        if let Some(listing) = self.held.take() {
            if self.order == Order::PreOrder {
                self.descend(&listing.frame, listing.id, &listing.links);
            }
        }
    }

    /// Advance until a frame is ready.
    fn step(&mut self) -> Option<Listing> {
        loop {
            let next_dir = match self.root.take() {
                Some(root) => root,
                None => {
                    let top = self.stack.last_mut()?;
                    match top.children.next() {
                        Some(child) => child,
                        None => {
                            let done = self.stack.pop()?;
                            if let Some(frame) = done.frame {
                                return Some(self.emit(frame));
                            }
                            continue;
                        }
                    }
                }
            };

            let Some(listing) = self.visit(next_dir) else {
                continue;
            };
            match self.order {
                Order::PreOrder => {
                    self.stats.frames += 1;
                    return Some(listing);
                }
                Order::PostOrder => {
                    let children = self.children(&listing.frame, &listing.links);
                    self.stack.push(Pending {
                        id: listing.id,
                        children: children.into_iter(),
                        frame: Some(listing.frame),
                    });
                }
            }
        }
    }

    fn emit(&mut self, frame: WalkFrame) -> Listing {
        self.stats.frames += 1;
        Listing {
            frame,
            id: None,
            links: HashMap::new(),
        }
    }

    /// Push the pre-order descent for a frame already handed out.
    fn descend(&mut self, frame: &WalkFrame, id: Option<DirId>, links: &HashMap<OsString, bool>) {
        let children = self.children(frame, links);
        self.stack.push(Pending {
            id,
            children: children.into_iter(),
            frame: None,
        });
    }

    /// Paths of the subdirectories to enter, in `frame.dirs` order.
    fn children(&mut self, frame: &WalkFrame, links: &HashMap<OsString, bool>) -> Vec<PathBuf> {
        let mut children = Vec::with_capacity(frame.dirs.len());
        for name in &frame.dirs {
            let path = frame.path.join(name);
            if !self.follow_links {
                let is_link = match links.get(name) {
                    Some(&known) => known,
                    None => {
                        self.stats.link_queries += 1;
                        self.lister.is_symlink(&path)
                    }
                };
                if is_link {
                    continue;
                }
            }
            children.push(path);
        }
        children
    }

    /// List one directory. `None` when it failed or was skipped.
    fn visit(&mut self, path: PathBuf) -> Option<Listing> {
        let id = if self.follow_links {
            self.lister.identity(&path)
        } else {
            None
        };
        if let Some(id) = id {
            if self.stack.iter().any(|p| p.id == Some(id)) {
                debug!("skipping {}: already on the current path", path.display());
                self.stats.loops_skipped += 1;
                return None;
            }
        }

        let mut stream = match self.lister.open(&path) {
            Ok(stream) => stream,
            Err(err) => {
                self.report(err);
                return None;
            }
        };
        self.stats.dirs_opened += 1;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut links = HashMap::new();
        let read = loop {
            match stream.next_entry() {
                Ok(Some(entry)) => {
                    self.stats.entries += 1;
                    if self.is_dir(&path, &entry) {
                        if let (false, Some(link)) = (self.follow_links, entry.is_symlink_hint()) {
                            links.insert(entry.name().to_os_string(), link);
                        }
                        dirs.push(entry.into_name());
                    } else {
                        files.push(entry.into_name());
                    }
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        let closed = stream.close();

        if let Err(err) = read {
            self.report(err);
            if let Err(err) = closed {
                self.report(err);
            }
            return None;
        }
        if let Err(err) = closed {
            self.report(err);
        }

        Some(Listing {
            frame: WalkFrame { path, dirs, files },
            id,
            links,
        })
    }

    fn is_dir(&mut self, parent: &Path, entry: &DirEntry) -> bool {
        match entry.hint() {
            TypeHint::Dir => true,
            TypeHint::NonDir => false,
            TypeHint::Unknown => {
                self.stats.type_queries += 1;
                self.lister.is_dir(&parent.join(entry.name()))
            }
        }
    }

    fn report(&mut self, err: WalkError) {
        self.stats.errors += 1;
        debug!("{err}");
        if let Some(handler) = self.on_error.as_mut() {
            handler(err);
        }
    }
}

impl<L: DirLister> Iterator for Walk<L> {
    type Item = WalkFrame;

    fn next(&mut self) -> Option<WalkFrame> {
        self.release_held();
        let listing = self.step()?;
        if self.order == Order::PreOrder {
            self.descend(&listing.frame, listing.id, &listing.links);
        }
        Some(listing.frame)
    }
}

impl<L: DirLister> FusedIterator for Walk<L> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind, Operation, Result};
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::rc::Rc;

    /// Open/close counters shared between a fake lister and its streams.
    #[derive(Default)]
    struct Sessions {
        opened: Cell<usize>,
        closed: Cell<usize>,
    }

    impl Sessions {
        fn open_now(&self) -> usize {
            self.opened.get() - self.closed.get()
        }
    }

    /// What a fake directory does when listed.
    #[derive(Clone)]
    enum FakeDir {
        Entries(Vec<DirEntry>),
        /// Yields the entries, then fails.
        FailsAfter(Vec<DirEntry>),
        Denied,
    }

    /// In-memory lister keyed by path.
    struct FakeLister {
        dirs: HashMap<PathBuf, FakeDir>,
        symlinks: HashSet<PathBuf>,
        sessions: Rc<Sessions>,
        fail_close: bool,
    }

    impl FakeLister {
        fn new() -> Self {
            Self {
                dirs: HashMap::new(),
                symlinks: HashSet::new(),
                sessions: Rc::new(Sessions::default()),
                fail_close: false,
            }
        }

        fn dir(mut self, path: &str, entries: Vec<DirEntry>) -> Self {
            self.dirs.insert(PathBuf::from(path), FakeDir::Entries(entries));
            self
        }

        fn with(mut self, path: &str, dir: FakeDir) -> Self {
            self.dirs.insert(PathBuf::from(path), dir);
            self
        }
    }

    struct FakeStream {
        entries: std::vec::IntoIter<DirEntry>,
        fail_at_end: bool,
        fail_close: bool,
        path: PathBuf,
        sessions: Rc<Sessions>,
        closed: bool,
    }

    impl EntryStream for FakeStream {
        fn next_entry(&mut self) -> Result<Option<DirEntry>> {
            match self.entries.next() {
                Some(entry) => Ok(Some(entry)),
                None if self.fail_at_end => Err(Error::from_raw(&self.path, Operation::Read, 5)),
                None => Ok(None),
            }
        }

        fn close(mut self) -> Result<()> {
            self.closed = true;
            self.sessions.closed.set(self.sessions.closed.get() + 1);
            if self.fail_close {
                return Err(Error::from_raw(&self.path, Operation::Close, 9));
            }
            Ok(())
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            if !self.closed {
                self.sessions.closed.set(self.sessions.closed.get() + 1);
            }
        }
    }

    impl DirLister for FakeLister {
        type Stream = FakeStream;

        fn open(&self, path: &Path) -> Result<FakeStream> {
            let (entries, fail_at_end) = match self.dirs.get(path) {
                Some(FakeDir::Entries(e)) => (e.clone(), false),
                Some(FakeDir::FailsAfter(e)) => (e.clone(), true),
                Some(FakeDir::Denied) => {
                    return Err(Error::from_io(
                        path,
                        Operation::Open,
                        &std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                    ))
                }
                None => {
                    return Err(Error::from_io(
                        path,
                        Operation::Open,
                        &std::io::Error::from(std::io::ErrorKind::NotFound),
                    ))
                }
            };
            self.sessions.opened.set(self.sessions.opened.get() + 1);
            Ok(FakeStream {
                entries: entries.into_iter(),
                fail_at_end,
                fail_close: self.fail_close,
                path: path.to_path_buf(),
                sessions: Rc::clone(&self.sessions),
                closed: false,
            })
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.dirs.contains_key(path)
        }

        fn is_symlink(&self, path: &Path) -> bool {
            self.symlinks.contains(path)
        }

        fn identity(&self, _path: &Path) -> Option<DirId> {
            None
        }
    }

    fn d(name: &str) -> DirEntry {
        DirEntry::new(name, TypeHint::Dir).with_symlink(false)
    }

    fn f(name: &str) -> DirEntry {
        DirEntry::new(name, TypeHint::NonDir).with_symlink(false)
    }

    /// root/{a/{c}, b, x.txt}, a/y.txt
    fn small_tree() -> FakeLister {
        FakeLister::new()
            .dir("root", vec![d("a"), d("b"), f("x.txt")])
            .dir("root/a", vec![d("c"), f("y.txt")])
            .dir("root/a/c", vec![])
            .dir("root/b", vec![])
    }

    fn paths(frames: &[WalkFrame]) -> Vec<String> {
        frames
            .iter()
            .map(|fr| fr.path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn pre_order_emits_parents_first() {
        let frames: Vec<_> = WalkDir::new("root").lister(small_tree()).into_iter().collect();
        assert_eq!(paths(&frames), ["root", "root/a", "root/a/c", "root/b"]);
        assert_eq!(frames[0].dirs, ["a", "b"]);
        assert_eq!(frames[0].files, ["x.txt"]);
    }

    #[test]
    fn post_order_emits_children_first() {
        let frames: Vec<_> = WalkDir::new("root")
            .lister(small_tree())
            .order(Order::PostOrder)
            .into_iter()
            .collect();
        assert_eq!(paths(&frames), ["root/a/c", "root/a", "root/b", "root"]);
    }

    #[test]
    fn hinted_entries_need_no_queries() {
        let mut walk = WalkDir::new("root").lister(small_tree()).into_iter();
        while walk.next().is_some() {}
        let stats = walk.stats();
        assert_eq!(stats.extra_queries(), 0);
        assert_eq!(stats.dirs_opened, 4);
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.entries, 5);
    }

    #[test]
    fn unknown_hints_fall_back_to_queries() {
        let lister = FakeLister::new()
            .dir(
                "root",
                vec![DirEntry::new("sub", TypeHint::Unknown), DirEntry::new("f", TypeHint::Unknown)],
            )
            .dir("root/sub", vec![]);
        let mut walk = WalkDir::new("root").lister(lister).into_iter();
        let first = walk.next().unwrap();
        assert_eq!(first.dirs, ["sub"]);
        assert_eq!(first.files, ["f"]);
        assert_eq!(walk.by_ref().count(), 1);
        // Two type queries, plus one link query for "sub" since the listing gave no link flag.
        assert_eq!(walk.stats().type_queries, 2);
        assert_eq!(walk.stats().link_queries, 1);
    }

    #[test]
    fn early_stop_leaves_no_open_sessions() {
        let lister = small_tree();
        let sessions = Rc::clone(&lister.sessions);
        let mut walk = WalkDir::new("root").lister(lister).into_iter();
        assert!(walk.next().is_some());
        assert!(walk.next().is_some());
        assert_eq!(sessions.open_now(), 0);
        assert_eq!(sessions.opened.get(), 2);
        drop(walk);
        assert_eq!(sessions.open_now(), 0);
    }

    #[test]
    fn unreadable_directory_is_reported_once_and_skipped() {
        let lister = FakeLister::new()
            .dir("root", vec![d("dirA"), d("dirC")])
            .dir("root/dirA", vec![d("dirB")])
            .with("root/dirA/dirB", FakeDir::Denied)
            .dir("root/dirC", vec![]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let frames: Vec<_> = WalkDir::new("root")
            .lister(lister)
            .on_error(move |err| sink.borrow_mut().push(err))
            .into_iter()
            .collect();

        assert_eq!(paths(&frames), ["root", "root/dirA", "root/dirC"]);
        let errors = seen.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), Path::new("root/dirA/dirB"));
        assert_eq!(errors[0].kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn errors_without_handler_are_swallowed() {
        let lister = FakeLister::new()
            .dir("root", vec![d("gone"), d("ok")])
            .dir("root/ok", vec![]);
        let mut walk = WalkDir::new("root").lister(lister).into_iter();
        let frames: Vec<_> = walk.by_ref().collect();
        assert_eq!(paths(&frames), ["root", "root/ok"]);
        assert_eq!(walk.stats().errors, 1);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let frames: Vec<_> = WalkDir::new("nowhere").lister(FakeLister::new()).into_iter().collect();
        assert!(frames.is_empty());
    }

    #[test]
    fn mid_read_failure_drops_the_frame_and_closes() {
        let lister = FakeLister::new()
            .dir("root", vec![d("bad"), d("good")])
            .with("root/bad", FakeDir::FailsAfter(vec![f("partial")]))
            .dir("root/good", vec![]);
        let sessions = Rc::clone(&lister.sessions);
        let errors = Rc::new(Cell::new(0));
        let counter = Rc::clone(&errors);

        let frames: Vec<_> = WalkDir::new("root")
            .lister(lister)
            .on_error(move |err| {
                assert_eq!(err.operation(), Operation::Read);
                counter.set(counter.get() + 1);
            })
            .into_iter()
            .collect();

        assert_eq!(paths(&frames), ["root", "root/good"]);
        assert_eq!(errors.get(), 1);
        assert_eq!(sessions.opened.get(), 3);
        assert_eq!(sessions.open_now(), 0);
    }

    #[test]
    fn close_failure_is_reported_but_frame_survives() {
        let mut lister = FakeLister::new().dir("root", vec![f("only")]);
        lister.fail_close = true;
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);

        let frames: Vec<_> = WalkDir::new("root")
            .lister(lister)
            .on_error(move |err| sink.borrow_mut().push(err.operation()))
            .into_iter()
            .collect();

        assert_eq!(frames.len(), 1);
        assert_eq!(*errors.borrow(), [Operation::Close]);
    }

    #[test]
    fn symlinked_dirs_are_listed_but_not_entered() {
        let lister = FakeLister::new()
            .dir(
                "root",
                vec![d("real"), DirEntry::new("link", TypeHint::Dir).with_symlink(true)],
            )
            .dir("root/real", vec![])
            .dir("root/link", vec![f("inside")]);

        let frames: Vec<_> = WalkDir::new("root").lister(lister).into_iter().collect();
        assert_eq!(frames[0].dirs, ["real", "link"]);
        assert_eq!(paths(&frames), ["root", "root/real"]);
    }

    #[test]
    fn follow_links_enters_symlinked_dirs() {
        let lister = FakeLister::new()
            .dir(
                "root",
                vec![d("real"), DirEntry::new("link", TypeHint::Dir).with_symlink(true)],
            )
            .dir("root/real", vec![])
            .dir("root/link", vec![f("inside")]);

        let frames: Vec<_> = WalkDir::new("root")
            .lister(lister)
            .follow_links(true)
            .into_iter()
            .collect();
        assert_eq!(paths(&frames), ["root", "root/real", "root/link"]);
        assert_eq!(frames[2].files, ["inside"]);
    }

    #[test]
    fn unhinted_link_is_checked_before_descent() {
        let mut lister = FakeLister::new()
            .dir("root", vec![DirEntry::new("link", TypeHint::Dir)])
            .dir("root/link", vec![]);
        lister.symlinks.insert(PathBuf::from("root/link"));

        let mut walk = WalkDir::new("root").lister(lister).into_iter();
        let frames: Vec<_> = walk.by_ref().collect();
        assert_eq!(paths(&frames), ["root"]);
        assert_eq!(walk.stats().link_queries, 1);
    }

    #[test]
    fn pruning_dirs_skips_subtrees() {
        let mut walk = WalkDir::new("root").lister(small_tree()).into_iter();
        let mut visited = Vec::new();
        while let Some(frame) = walk.next_frame() {
            visited.push(frame.path.clone());
            frame.dirs.retain(|name| name != "a");
        }
        let visited: Vec<_> = visited
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(visited, ["root", "root/b"]);
    }

    #[test]
    fn reordering_dirs_changes_visit_order() {
        let mut walk = WalkDir::new("root").lister(small_tree()).into_iter();
        let mut visited = Vec::new();
        while let Some(frame) = walk.next_frame() {
            visited.push(frame.path.to_string_lossy().replace('\\', "/"));
            frame.dirs.reverse();
        }
        assert_eq!(visited, ["root", "root/b", "root/a", "root/a/c"]);
    }

    #[test]
    fn pruning_in_post_order_has_no_effect() {
        let mut walk = WalkDir::new("root")
            .lister(small_tree())
            .order(Order::PostOrder)
            .into_iter();
        let mut count = 0;
        while let Some(frame) = walk.next_frame() {
            frame.dirs.clear();
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn walk_function_matches_builder() {
        let tmp = tempfile::TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub").join("leaf"), b"x").unwrap();

        let built: Vec<_> = WalkDir::new(tmp.path()).into_iter().collect();
        let direct: Vec<_> = walk(tmp.path(), Order::PreOrder, false, None).collect();
        assert_eq!(built, direct);
        assert_eq!(built.len(), 2);
        assert_eq!(built[1].files, ["leaf"]);
    }

    #[test]
    fn exhausted_walk_stays_exhausted() {
        let mut walk = WalkDir::new("root").lister(small_tree()).into_iter();
        while walk.next().is_some() {}
        assert!(walk.next().is_none());
        assert!(walk.next_frame().is_none());
    }
}
