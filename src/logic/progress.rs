//! Weighted progress aggregation for one refresh run.
//!
//! Multiple asynchronous sources (repository sync, the per-item update-check
//! batch) each report a completion fraction; the aggregator folds them into a
//! single integer on a fixed display scale. The combined value is clamped to
//! be monotone non-decreasing for the duration of the run, and reads are
//! lock-free so a UI poller never observes a torn value.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Upper bound of the display scale.
pub const SCALE: u32 = 10_000;

/// Weight carried by the repository-sync source when per-item checks run.
pub const SYNC_WEIGHT_SPLIT: f64 = 0.75;
/// Weight carried by the per-item check batch.
pub const CHECK_WEIGHT: f64 = 0.25;

/// Handle identifying a registered progress source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceHandle(usize);

/// One registered source: its weight and latest completion fraction.
#[derive(Debug)]
struct SourceSlot {
    weight: f64,
    completion: f64,
}

/// Combines weighted fractional sources into one bounded integer.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    /// Registered sources for the current run.
    sources: Mutex<Vec<SourceSlot>>,
    /// Last committed aggregate in `[0, SCALE]`; monotone within a run.
    committed: AtomicU32,
}

impl ProgressAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Register a source with the given weight for the current run.
    ///
    /// Inputs:
    /// - `weight`: Share of the total scale in `[0, 1]`; the weights of all
    ///   concurrently active sources must sum to at most 1
    ///
    /// Output:
    /// - Handle for subsequent [`ProgressAggregator::report`] calls.
    pub fn register_source(&self, weight: f64) -> SourceHandle {
        let weight = weight.clamp(0.0, 1.0);
        match self.sources.lock() {
            Ok(mut slots) => {
                slots.push(SourceSlot {
                    weight,
                    completion: 0.0,
                });
                SourceHandle(slots.len() - 1)
            }
            Err(_) => SourceHandle(usize::MAX),
        }
    }

    /// What: Record a completion fraction for one source and commit the new
    /// aggregate.
    ///
    /// Inputs:
    /// - `handle`: Source being reported
    /// - `fraction`: Completion in `[0, 1]`; out-of-range values are clamped
    ///
    /// Details:
    /// - The committed aggregate never moves backward within a run; a report
    ///   that would lower it is clamped, not propagated.
    pub fn report(&self, handle: SourceHandle, fraction: f64) {
        let aggregate = match self.sources.lock() {
            Ok(mut slots) => {
                let Some(slot) = slots.get_mut(handle.0) else {
                    return;
                };
                slot.completion = fraction.clamp(0.0, 1.0);
                Self::weighted_sum(&slots)
            }
            Err(_) => return,
        };
        self.committed.fetch_max(aggregate, Ordering::SeqCst);
    }

    /// What: Force every registered source to completion and commit `SCALE`.
    ///
    /// Details:
    /// - Called once at the end of a run so the displayed value lands on the
    ///   scale's upper bound exactly, independent of float rounding.
    pub fn finish(&self) {
        if let Ok(mut slots) = self.sources.lock() {
            for slot in slots.iter_mut() {
                slot.completion = 1.0;
            }
        }
        self.committed.fetch_max(SCALE, Ordering::SeqCst);
    }

    /// What: Forget all sources and restart from zero for a new run.
    pub fn reset(&self) {
        if let Ok(mut slots) = self.sources.lock() {
            slots.clear();
        }
        self.committed.store(0, Ordering::SeqCst);
    }

    /// Latest committed aggregate in `[0, SCALE]`. Safe to call concurrently
    /// with `report`; always returns a fully committed value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.committed.load(Ordering::SeqCst)
    }

    /// Scaled weighted sum over all slots, bounded by `SCALE`.
    fn weighted_sum(slots: &[SourceSlot]) -> u32 {
        let sum: f64 = slots.iter().map(|s| s.weight * s.completion).sum();
        let scaled = (sum * f64::from(SCALE)).round();
        if scaled >= f64::from(SCALE) {
            SCALE
        } else if scaled <= 0.0 {
            0
        } else {
            scaled as u32
        }
    }
}
