//! dirwalk-bench: times the native walker against conventional walkers.
//!
//! Thin binary entry point. All logic lives in the `dirwalk-core` crate.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dirwalk_core::bench::{self, BenchConfig, TreeShape};

/// Directory created when no tree is given.
const DEFAULT_TREE: &str = "benchtree";

#[derive(Parser, Debug)]
#[command(name = "dirwalk-bench")]
#[command(about = "Benchmark the native directory walker against conventional walkers")]
#[command(version)]
struct Args {
    /// Tree to walk. Without one, a synthetic tree is created at ./benchtree
    tree: Option<PathBuf>,

    /// Sum file sizes while walking and check every walker agrees
    #[arg(short, long)]
    size: bool,

    /// Timed runs per walker; the best is reported
    #[arg(short, long, default_value_t = 3)]
    repeat: usize,

    /// Baseline on std::fs::read_dir instead of the native names-only listing
    #[arg(long)]
    std_walk: bool,

    /// Also time a parallel jwalk walk
    #[arg(long)]
    jwalk: bool,

    /// Depth of the synthetic tree
    #[arg(long, default_value_t = TreeShape::default().depth)]
    depth: u32,

    /// Subdirectories per directory in the synthetic tree
    #[arg(long, default_value_t = TreeShape::default().dirs)]
    dirs: u32,

    /// Files per directory in the synthetic tree
    #[arg(long, default_value_t = TreeShape::default().files)]
    files: u32,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log handled per-directory failures
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialise structured logging. Logs go to stderr so `--json` output
    // stays machine-readable.
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("dirwalk-bench starting");

    let tree = match args.tree {
        Some(tree) => tree,
        None => {
            let tree = PathBuf::from(DEFAULT_TREE);
            if !tree.exists() {
                let shape = TreeShape {
                    depth: args.depth,
                    dirs: args.dirs,
                    files: args.files,
                };
                tracing::info!(
                    "Creating tree at {} ({} files, {}): depth={}, dirs={}, files={}",
                    tree.display(),
                    bench::size::format_count(shape.file_count()),
                    bench::size::format_size(shape.expected_bytes()),
                    shape.depth,
                    shape.dirs,
                    shape.files
                );
                bench::create_tree(&tree, &shape)
                    .with_context(|| format!("creating benchmark tree at {}", tree.display()))?;
            }
            tree
        }
    };

    anyhow::ensure!(tree.is_dir(), "{} is not a directory", tree.display());

    let config = BenchConfig {
        path: tree,
        get_size: args.size,
        repeats: args.repeat,
        std_baseline: args.std_walk,
        include_jwalk: args.jwalk,
    };
    let report = bench::run(&config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    if report.sizes_equal == Some(false) {
        anyhow::bail!("walkers disagree on the size of {}", report.path);
    }
    Ok(())
}
