//! Fixed-capacity latency sample buffer.
//!
//! Each measurement overwrites a uniformly random slot out of
//! [`SAMPLE_SLOTS`]. This is NOT reservoir sampling: nothing decays, so a
//! slot filled in the first second survives until a later measurement
//! happens to land on it. Old and new samples are therefore both
//! over-represented compared to a true uniform sample of the stream, and
//! the reported min/avg/max inherit that bias.
//!
//! A slot value of zero means "never filled". Real measurements are always
//! at least one nanosecond.

// Millisecond conversions intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use rand::Rng;
use serde::Serialize;

/// Number of slots in every sample buffer
pub const SAMPLE_SLOTS: usize = 10_000;

/// Pick the slot the next measurement will overwrite.
pub fn pick_slot<R: Rng + ?Sized>(rng: &mut R) -> usize {
    rng.gen_range(0..SAMPLE_SLOTS)
}

/// Random-overwrite latency buffer (nanoseconds, zero = empty)
#[derive(Debug, Clone)]
pub struct LatencySamples {
    slots: Box<[u64]>,
}

impl Default for LatencySamples {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencySamples {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: vec![0; SAMPLE_SLOTS].into_boxed_slice() }
    }

    /// Overwrite `slot` with a measurement.
    ///
    /// # Panics
    /// If `slot` is out of range.
    pub fn record(&mut self, slot: usize, nanos: u64) {
        debug_assert!(nanos > 0, "zero is reserved for empty slots");
        self.slots[slot] = nanos;
    }

    /// Min/avg/max over the filled slots.
    ///
    /// The average is the integer quotient of the nanosecond sum by the
    /// number of filled slots; the fraction is dropped before conversion
    /// to milliseconds.
    #[must_use]
    pub fn summarize(&self) -> LatencySummary {
        let mut summary = LatencySummary::default();
        let mut total: u128 = 0;

        for &val in self.slots.iter().filter(|&&v| v != 0) {
            if summary.samples == 0 || val < summary.min_ns {
                summary.min_ns = val;
            }
            summary.max_ns = summary.max_ns.max(val);
            summary.samples += 1;
            total += u128::from(val);
        }

        if summary.samples > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let avg = (total / summary.samples as u128) as u64;
            summary.avg_ns = avg;
        }
        summary
    }
}

/// Result of [`LatencySamples::summarize`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    /// Number of filled slots
    pub samples: usize,
    pub min_ns: u64,
    pub avg_ns: u64,
    pub max_ns: u64,
}

impl LatencySummary {
    #[must_use]
    pub fn min_ms(&self) -> f64 {
        self.min_ns as f64 / 1_000_000.0
    }

    #[must_use]
    pub fn avg_ms(&self) -> f64 {
        self.avg_ns as f64 / 1_000_000.0
    }

    #[must_use]
    pub fn max_ms(&self) -> f64 {
        self.max_ns as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_summary_is_zero() {
        let samples = LatencySamples::new();
        let summary = samples.summarize();

        assert_eq!(summary.samples, 0);
        assert_eq!(summary.min_ms(), 0.0);
        assert_eq!(summary.avg_ms(), 0.0);
        assert_eq!(summary.max_ms(), 0.0);
    }

    #[test]
    fn test_single_sample() {
        let mut samples = LatencySamples::new();
        samples.record(42, 5_000_000);
        let summary = samples.summarize();

        assert_eq!(summary.samples, 1);
        assert_eq!(format!("{:.2}", summary.min_ms()), "5.00");
        assert_eq!(format!("{:.2}", summary.avg_ms()), "5.00");
        assert_eq!(format!("{:.2}", summary.max_ms()), "5.00");
    }

    #[test]
    fn test_average_truncates_before_conversion() {
        let mut samples = LatencySamples::new();
        samples.record(0, 1);
        samples.record(1, 2);
        // (1 + 2) / 2 = 1 in integer nanoseconds
        let summary = samples.summarize();
        assert_eq!(summary.avg_ns, 1);
        assert_eq!(summary.min_ns, 1);
        assert_eq!(summary.max_ns, 2);
    }

    #[test]
    fn test_overwrite_replaces_slot() {
        let mut samples = LatencySamples::new();
        samples.record(7, 9_000);
        samples.record(7, 3_000);
        let summary = samples.summarize();
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.max_ns, 3_000);
    }

    #[test]
    fn test_pick_slot_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(pick_slot(&mut rng) < SAMPLE_SLOTS);
        }
    }
}
