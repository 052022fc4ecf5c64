/// Benchmark plumbing around the walker.
///
/// Compares the native walker against a conventional baseline walker (and
/// optionally a parallel `jwalk` walk) over the same tree. The baseline
/// lists names with the same native primitive and classifies every entry
/// with `stat`; `std_baseline` swaps in a walker on `std::fs::read_dir`.
///
/// 1. Run the native walker once untimed to warm the OS caches.
/// 2. For each repeat, time every contender once and keep its best time.
/// 3. In size mode, each contender also sums the file bytes it saw, and
///    the totals must match.
pub mod fixture;
pub mod parallel;
pub mod reference;
pub mod report;
pub mod size;
pub mod timing;

pub use fixture::{create_tree, TreeShape};
pub use report::{BenchReport, ContenderResult};

use crate::walker::{Order, WalkDir};
use reference::BaselineWalk;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Contender names as they appear in reports.
pub const LISTDIR: &str = "listdir";
pub const STD: &str = "std";
pub const NATIVE: &str = "native";
pub const JWALK: &str = "jwalk";

/// What to benchmark.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub path: PathBuf,
    /// Sum file sizes while walking.
    pub get_size: bool,
    pub repeats: usize,
    /// Use the `std::fs` walker as the baseline.
    pub std_baseline: bool,
    /// Add the parallel `jwalk` contender.
    pub include_jwalk: bool,
}

impl BenchConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            get_size: false,
            repeats: 3,
            std_baseline: false,
            include_jwalk: false,
        }
    }
}

type Contender = Box<dyn Fn() -> Option<u64>>;

fn contenders(config: &BenchConfig) -> Vec<(&'static str, Contender)> {
    let mut list: Vec<(&'static str, Contender)> = Vec::new();

    let path = config.path.clone();
    let (name, walk, tree_size): (_, BaselineWalk, fn(&Path) -> u64) = if config.std_baseline {
        (STD, reference::std_walk, size::std_tree_size)
    } else {
        (LISTDIR, reference::names_walk, size::names_tree_size)
    };
    let baseline: Contender = if config.get_size {
        Box::new(move || Some(tree_size(&path)))
    } else {
        Box::new(move || {
            walk(&path, Order::PreOrder, false, &mut |_| {}, &mut |_| {});
            None
        })
    };
    list.push((name, baseline));

    let path = config.path.clone();
    let native_run: Contender = if config.get_size {
        Box::new(move || Some(size::hinted_tree_size(&path)))
    } else {
        Box::new(move || {
            WalkDir::new(&path).into_iter().for_each(drop);
            None
        })
    };
    list.push((NATIVE, native_run));

    if config.include_jwalk {
        let path = config.path.clone();
        let jwalk_run: Contender = if config.get_size {
            Box::new(move || Some(parallel::jwalk_tree_size(&path)))
        } else {
            Box::new(move || {
                parallel::jwalk_dir_count(&path);
                None
            })
        };
        list.push((JWALK, jwalk_run));
    }
    list
}

/// Run the benchmark described by `config`.
pub fn run(config: &BenchConfig) -> BenchReport {
    let contenders = contenders(config);
    let repeats = config.repeats.max(1);

    info!("Priming the system's cache...");
    timing::prime(|| WalkDir::new(&config.path).into_iter().count());

    let mut best: Vec<Option<Duration>> = vec![None; contenders.len()];
    let mut sizes: Vec<Option<u64>> = vec![None; contenders.len()];
    for i in 0..repeats {
        info!(
            "Benchmarking walks on {}, repeat {}/{}...",
            config.path.display(),
            i + 1,
            repeats
        );
        for (slot, (_, run)) in contenders.iter().enumerate() {
            let (elapsed, size) = timing::time_once(run);
            timing::keep_best(&mut best[slot], elapsed);
            sizes[slot] = size;
        }
    }

    let results: Vec<ContenderResult> = contenders
        .iter()
        .zip(best.iter().zip(&sizes))
        .map(|((name, _), (time, size))| ContenderResult {
            name: (*name).to_string(),
            best_secs: time.unwrap_or_default().as_secs_f64(),
            size: *size,
        })
        .collect();

    let sizes_equal = config.get_size.then(|| {
        results
            .windows(2)
            .all(|pair| pair[0].size == pair[1].size)
    });

    BenchReport {
        path: config.path.display().to_string(),
        repeats,
        results,
        sizes_equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_fixture() -> (TempDir, PathBuf, TreeShape) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let root = tmp.path().join("bench");
        let shape = TreeShape {
            depth: 2,
            dirs: 2,
            files: 3,
        };
        create_tree(&root, &shape).unwrap();
        (tmp, root, shape)
    }

    #[test]
    fn size_mode_reports_equal_sizes() {
        let (_tmp, root, shape) = small_fixture();
        let mut config = BenchConfig::new(&root);
        config.get_size = true;
        config.repeats = 1;
        config.include_jwalk = true;

        let report = run(&config);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.sizes_equal, Some(true));
        assert_eq!(
            report.result(NATIVE).and_then(|r| r.size),
            Some(shape.expected_bytes())
        );
    }

    #[test]
    fn plain_mode_has_no_sizes() {
        let (_tmp, root, _) = small_fixture();
        let report = run(&BenchConfig::new(&root));
        assert_eq!(report.repeats, 3);
        assert_eq!(report.sizes_equal, None);
        assert!(report.results.iter().all(|r| r.size.is_none()));
        assert_eq!(report.results[0].name, LISTDIR);
        assert!(report.speedup(LISTDIR, NATIVE).is_some());
    }

    #[test]
    fn std_baseline_is_named_std() {
        let (_tmp, root, shape) = small_fixture();
        let mut config = BenchConfig::new(&root);
        config.std_baseline = true;
        config.get_size = true;
        config.repeats = 1;

        let report = run(&config);
        let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, [STD, NATIVE]);
        assert_eq!(
            report.result(STD).and_then(|r| r.size),
            Some(shape.expected_bytes())
        );
    }

    #[cfg(unix)]
    #[test]
    fn size_mode_agrees_with_directory_links_present() {
        let (_tmp, root, shape) = small_fixture();
        std::os::unix::fs::symlink(root.join("dir000"), root.join("dlink")).unwrap();

        let mut config = BenchConfig::new(&root);
        config.get_size = true;
        config.repeats = 1;
        config.include_jwalk = true;

        let report = run(&config);
        assert_eq!(report.sizes_equal, Some(true), "{report}");
        assert_eq!(
            report.result(JWALK).and_then(|r| r.size),
            Some(shape.expected_bytes())
        );
    }
}
