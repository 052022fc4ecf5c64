/// Benchmark results, as plain data the front-end prints or serialises.
use super::size::format_size;
use serde::Serialize;
use std::fmt;

/// Best time and optional byte total for one walker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContenderResult {
    pub name: String,
    /// Best-of-N wall-clock time in seconds.
    pub best_secs: f64,
    /// Bytes counted, when run in size mode.
    pub size: Option<u64>,
}

/// Outcome of one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchReport {
    pub path: String,
    pub repeats: usize,
    pub results: Vec<ContenderResult>,
    /// Whether every contender counted the same bytes (size mode only).
    pub sizes_equal: Option<bool>,
}

impl BenchReport {
    pub fn result(&self, name: &str) -> Option<&ContenderResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Name of the contender every other one is compared against.
    pub fn baseline(&self) -> Option<&str> {
        self.results.first().map(|r| r.name.as_str())
    }

    /// How many times faster `fast` was than `slow`.
    pub fn speedup(&self, slow: &str, fast: &str) -> Option<f64> {
        let slow = self.result(slow)?.best_secs;
        let fast = self.result(fast)?.best_secs;
        (fast > 0.0).then(|| slow / fast)
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (best of {})", self.path, self.repeats)?;
        for r in &self.results {
            write!(f, "  {:<8} {:>8.3}s", r.name, r.best_secs)?;
            if let Some(size) = r.size {
                write!(f, "  {size} bytes ({})", format_size(size))?;
            }
            writeln!(f)?;
        }
        match self.sizes_equal {
            Some(true) => writeln!(f, "  sizes equal")?,
            Some(false) => writeln!(f, "  sizes NOT EQUAL")?,
            None => {}
        }
        if let Some(baseline) = self.baseline() {
            if let Some(ratio) = self.speedup(baseline, super::NATIVE) {
                writeln!(f, "  {} was {ratio:.1}x as fast as {baseline}", super::NATIVE)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BenchReport {
        BenchReport {
            path: "tree".into(),
            repeats: 3,
            results: vec![
                ContenderResult {
                    name: "std".into(),
                    best_secs: 2.0,
                    size: Some(2048),
                },
                ContenderResult {
                    name: "native".into(),
                    best_secs: 0.5,
                    size: Some(2048),
                },
            ],
            sizes_equal: Some(true),
        }
    }

    #[test]
    fn speedup_is_slow_over_fast() {
        let r = report();
        assert_eq!(r.speedup("std", "native"), Some(4.0));
        assert_eq!(r.speedup("std", "jwalk"), None);
    }

    #[test]
    fn display_mentions_equality_and_ratio() {
        let text = report().to_string();
        assert!(text.contains("sizes equal"), "{text}");
        assert!(text.contains("4.0x"), "{text}");
        assert!(text.contains("2.0 KB"), "{text}");
    }
}
