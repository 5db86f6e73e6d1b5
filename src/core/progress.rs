//! Purpose: Progress reporting and cooperative cancellation primitives.
//! Exports: `CancelToken`, `PhaseBand`, `CHUNK_BAND`.
//! Role: Plain synchronous notification plumbing shared by export and
//! search; one consumer per job, no event bus.
//! Invariants: Percentages produced through a band are monotone
//! non-decreasing within that band and stay inside `[lo, hi]`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag polled between chunks. Clones observe the
/// same flag; cancellation is sticky.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The underlying flag, for wiring to signal handlers.
    pub fn as_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// A sub-range of overall job progress. Chunk work is remapped into its
/// band so setup and teardown keep their own head/tail percentages.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBand {
    pub lo: f64,
    pub hi: f64,
}

/// Band reserved for per-chunk work during export and search.
pub const CHUNK_BAND: PhaseBand = PhaseBand { lo: 15.0, hi: 85.0 };

impl PhaseBand {
    /// Percentage after `done` of `total` units completed.
    pub fn at(&self, done: usize, total: usize) -> f64 {
        if total == 0 {
            return self.hi;
        }
        let fraction = (done.min(total)) as f64 / total as f64;
        self.lo + (self.hi - self.lo) * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, CHUNK_BAND};

    #[test]
    fn cancel_is_shared_and_sticky() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn band_is_monotone_and_bounded() {
        let mut last = 0.0;
        for done in 0..=7 {
            let pct = CHUNK_BAND.at(done, 7);
            assert!(pct >= last);
            assert!((CHUNK_BAND.lo..=CHUNK_BAND.hi).contains(&pct));
            last = pct;
        }
        assert_eq!(CHUNK_BAND.at(0, 7), CHUNK_BAND.lo);
        assert_eq!(CHUNK_BAND.at(7, 7), CHUNK_BAND.hi);
    }
}
