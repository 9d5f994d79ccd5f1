//! Statistical aggregation for probe latencies
//!
//! Each measured phase feeds one [`LatencyHistogram`]. Memory stays bounded
//! regardless of how many probes run: the histogram keeps a uniform random
//! reservoir of samples and estimates percentiles from the retained set.

use crate::error::{AppError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A bounded reservoir of duration samples in integer milliseconds.
///
/// Below capacity every sample is kept. At capacity, an incoming sample
/// replaces a uniformly chosen slot with probability `capacity / seen`
/// (Vitter's Algorithm R), so after N updates each of the N samples has
/// equal probability `capacity / N` of being retained.
pub struct UniformSample {
    capacity: usize,
    seen: u64,
    values: Vec<u64>,
    rng: StdRng,
}

impl UniformSample {
    /// Create a sample reservoir with the given capacity, seeded from entropy.
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Create a sample reservoir with a fixed seed, for reproducible runs.
    pub fn seeded(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: 0,
            values: Vec::with_capacity(capacity.max(1).min(4096)),
            rng,
        }
    }

    /// Record one sample in milliseconds.
    pub fn update(&mut self, value_ms: u64) {
        self.seen += 1;
        if self.values.len() < self.capacity {
            self.values.push(value_ms);
        } else {
            let slot = self.rng.gen_range(0..self.seen);
            if (slot as usize) < self.capacity {
                self.values[slot as usize] = value_ms;
            }
        }
    }

    /// Total number of updates ever received, not the retained sample size.
    pub fn count(&self) -> u64 {
        self.seen
    }

    /// Maximum number of samples this reservoir retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Minimum of the retained sample set, 0 when empty.
    pub fn min(&self) -> u64 {
        self.values.iter().copied().min().unwrap_or(0)
    }

    /// Maximum of the retained sample set, 0 when empty.
    pub fn max(&self) -> u64 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    /// Arithmetic mean of the retained sample set, 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| v as f64).sum::<f64>() / self.values.len() as f64
    }

    /// Linear-interpolated percentile over the sorted retained set.
    ///
    /// `percentile(0.0)` is the retained minimum and `percentile(1.0)` the
    /// retained maximum. Empty reservoirs answer 0.0 and single-element
    /// reservoirs answer their one value.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<u64> = self.values.clone();
        sorted.sort_unstable();

        let p = p.clamp(0.0, 1.0);
        let rank = p * (sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let low = sorted[lower] as f64;
        let high = sorted[upper] as f64;
        low + (rank - lower as f64) * (high - low)
    }

    /// The currently retained samples, in insertion/replacement order.
    pub fn retained(&self) -> &[u64] {
        &self.values
    }
}

/// Summary statistics for one measured phase, all values in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Total number of samples observed
    pub count: u64,
    /// Minimum of the retained sample set
    pub min: u64,
    /// Mean of the retained sample set
    pub mean: f64,
    /// Maximum of the retained sample set
    pub max: u64,
    /// 75th percentile, linear interpolation
    pub p75: f64,
    /// 99th percentile, linear interpolation
    pub p99: f64,
}

/// A named latency histogram backed by a [`UniformSample`].
pub struct LatencyHistogram {
    name: String,
    sample: UniformSample,
}

impl LatencyHistogram {
    /// Create a histogram sized for the expected number of probes.
    ///
    /// Undersizing does not fail, it only degrades percentile accuracy as
    /// the reservoir retains a smaller fraction of the stream.
    pub fn new<S: Into<String>>(name: S, capacity: usize) -> Self {
        Self {
            name: name.into(),
            sample: UniformSample::new(capacity),
        }
    }

    /// Create a histogram with a deterministic reservoir, for tests.
    pub fn seeded<S: Into<String>>(name: S, capacity: usize, seed: u64) -> Self {
        Self {
            name: name.into(),
            sample: UniformSample::seeded(capacity, seed),
        }
    }

    /// Phase name this histogram aggregates.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record one duration sample, truncated to whole milliseconds.
    pub fn record(&mut self, duration: Duration) {
        self.sample.update(duration.as_millis() as u64);
    }

    /// Total number of samples observed.
    pub fn count(&self) -> u64 {
        self.sample.count()
    }

    /// Take a summary snapshot of the current state.
    pub fn summary(&self) -> HistogramSummary {
        HistogramSummary {
            count: self.sample.count(),
            min: self.sample.min(),
            mean: self.sample.mean(),
            max: self.sample.max(),
            p75: self.sample.percentile(0.75),
            p99: self.sample.percentile(0.99),
        }
    }

    /// Arbitrary percentile query, delegated to the reservoir.
    pub fn percentile(&self, p: f64) -> f64 {
        self.sample.percentile(p)
    }
}

/// Derive the reservoir capacity for a run, mirroring the sizing rule the
/// probe loop has always used: roughly one check per second, times ten,
/// for duration-bounded runs; exact for count-bounded runs.
pub fn capacity_for_probes(expected_probes: usize) -> Result<usize> {
    if expected_probes == 0 {
        return Err(AppError::validation(
            "histogram capacity must cover at least one probe",
        ));
    }
    Ok(expected_probes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_count_tracks_all_updates() {
        let mut sample = UniformSample::seeded(4, 7);
        for v in 0..100 {
            sample.update(v);
        }
        assert_eq!(sample.count(), 100);
        assert_eq!(sample.retained().len(), 4);
    }

    #[test]
    fn test_no_loss_below_capacity() {
        let mut sample = UniformSample::seeded(10, 1);
        for v in [5, 3, 9] {
            sample.update(v);
        }
        assert_eq!(sample.count(), 3);
        let mut retained = sample.retained().to_vec();
        retained.sort_unstable();
        assert_eq!(retained, vec![3, 5, 9]);
    }

    #[test]
    fn test_summary_scenario() {
        let mut hist = LatencyHistogram::seeded("total", 8, 42);
        for ms in [10, 20, 30, 40, 50] {
            hist.record(Duration::from_millis(ms));
        }
        let summary = hist.summary();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.min, 10);
        assert_eq!(summary.max, 50);
        assert!((summary.mean - 30.0).abs() < f64::EPSILON);
        assert!((hist.percentile(0.5) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentile_bounds() {
        let mut sample = UniformSample::seeded(16, 3);
        for v in [12, 7, 44, 31, 19] {
            sample.update(v);
        }
        assert!((sample.percentile(0.0) - 7.0).abs() < f64::EPSILON);
        assert!((sample.percentile(1.0) - 44.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut sample = UniformSample::seeded(4, 3);
        for v in [10, 20] {
            sample.update(v);
        }
        assert!((sample.percentile(0.5) - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_sample_answers_zero() {
        let sample = UniformSample::seeded(4, 0);
        assert_eq!(sample.count(), 0);
        assert_eq!(sample.min(), 0);
        assert_eq!(sample.max(), 0);
        assert!(sample.mean().abs() < f64::EPSILON);
        assert!(sample.percentile(0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_element_percentile() {
        let mut sample = UniformSample::seeded(4, 0);
        sample.update(17);
        assert!((sample.percentile(0.25) - 17.0).abs() < f64::EPSILON);
        assert!((sample.percentile(0.99) - 17.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mean_matches_recomputation() {
        let mut sample = UniformSample::seeded(6, 11);
        for v in 1..=20 {
            sample.update(v);
        }
        let retained = sample.retained().to_vec();
        let direct = retained.iter().map(|&v| v as f64).sum::<f64>() / retained.len() as f64;
        assert!((sample.mean() - direct).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reservoir_retains_subset_of_stream() {
        let mut sample = UniformSample::seeded(8, 99);
        for v in 100..300 {
            sample.update(v);
        }
        assert_eq!(sample.retained().len(), 8);
        for &v in sample.retained() {
            assert!((100..300).contains(&v));
        }
    }

    #[test]
    fn test_capacity_for_probes() {
        assert_eq!(capacity_for_probes(50).unwrap(), 50);
        assert!(capacity_for_probes(0).is_err());
    }

    proptest! {
        #[test]
        fn prop_retained_size_bounded(values in prop::collection::vec(0u64..10_000, 0..200), capacity in 1usize..32) {
            let mut sample = UniformSample::seeded(capacity, 5);
            for &v in &values {
                sample.update(v);
            }
            prop_assert_eq!(sample.count(), values.len() as u64);
            prop_assert_eq!(sample.retained().len(), values.len().min(capacity));
            if !values.is_empty() {
                let lo = *values.iter().min().unwrap() as f64;
                let hi = *values.iter().max().unwrap() as f64;
                let p50 = sample.percentile(0.5);
                prop_assert!(p50 >= lo && p50 <= hi);
            }
        }
    }
}
