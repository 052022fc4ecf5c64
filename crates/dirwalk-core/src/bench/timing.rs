/// Wall-clock timing helpers.
use std::time::{Duration, Instant};

/// Run `f` once untimed so the OS caches are warm before measuring.
pub fn prime<T>(f: impl FnOnce() -> T) -> T {
    f()
}

/// Time one run of `f`.
pub fn time_once<T>(f: impl FnOnce() -> T) -> (Duration, T) {
    let start = Instant::now();
    let out = f();
    (start.elapsed(), out)
}

/// Keep the smaller of a running best and a new sample.
pub fn keep_best(best: &mut Option<Duration>, sample: Duration) {
    *best = Some(best.map_or(sample, |b| b.min(sample)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_once_returns_the_result() {
        let (_, out) = time_once(|| 42);
        assert_eq!(out, 42);
    }

    #[test]
    fn keep_best_tracks_minimum() {
        let mut best = None;
        keep_best(&mut best, Duration::from_millis(30));
        keep_best(&mut best, Duration::from_millis(10));
        keep_best(&mut best, Duration::from_millis(20));
        assert_eq!(best, Some(Duration::from_millis(10)));
    }
}
