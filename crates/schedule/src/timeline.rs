//! Event Timeline
//!
//! Samples the intra-bucket decision times and merges them with the bucket
//! bounds into the episode's ordered event sequence. The timeline is built
//! once by the benchmark schedule and shared by reference with the adaptive
//! schedule; both tracks therefore observe identical timestamps.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;

use crate::bucket::BucketSet;
use crate::error::{Result, ScheduleError};
use crate::event::EventKind;

/// Decision-time placement function: maps a slice count to fractions of the
/// bucket width in `[0, 1]`. User-suppliable; see [`default_placement`].
pub type PlacementFn = dyn Fn(usize, &mut StdRng) -> Vec<f64>;

/// Default placement: uniform fractions rounded to two decimals, sorted.
pub fn default_placement(slices: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut fracs: Vec<f64> = (0..slices)
        .map(|_| (rng.gen_range(0.0..=1.0_f64) * 100.0).round() / 100.0)
        .collect();
    fracs.sort_by(|a, b| a.partial_cmp(b).expect("fractions are finite"));
    fracs
}

/// Give up resampling a bucket's decision times after this many draws and
/// report the placement function as degenerate.
const MAX_PLACEMENT_DRAWS: usize = 10_000;

/// The ordered, de-duplicated sequence of an episode's event timestamps
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Merged decision times and bucket bounds (excluding the start bound)
    events: Vec<DateTime<Utc>>,
    /// Sampled decision times per bucket, sorted
    decision_times: Vec<Vec<DateTime<Utc>>>,
    /// Flattened sorted decision times, for event classification
    decision_index: Vec<DateTime<Utc>>,
}

impl Timeline {
    /// Sample `slices` decision times inside every bucket and merge them
    /// with the bucket bounds.
    ///
    /// Each bucket's offsets are redrawn until they are pairwise distinct
    /// and none coincides with any bucket bound, so every timestamp has an
    /// unambiguous classification.
    pub fn sample(
        buckets: &BucketSet,
        slices: usize,
        placement: &PlacementFn,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let mut decision_times = Vec::with_capacity(buckets.n_buckets());
        for bucket in 0..buckets.n_buckets() {
            decision_times.push(Self::sample_bucket(buckets, bucket, slices, placement, rng)?);
        }

        let mut decision_index: Vec<DateTime<Utc>> =
            decision_times.iter().flatten().copied().collect();
        decision_index.sort();
        decision_index.dedup();

        let mut events = decision_index.clone();
        events.extend_from_slice(&buckets.bounds()[1..]);
        events.sort();
        events.dedup();

        Ok(Self {
            events,
            decision_times,
            decision_index,
        })
    }

    fn sample_bucket(
        buckets: &BucketSet,
        bucket: usize,
        slices: usize,
        placement: &PlacementFn,
        rng: &mut StdRng,
    ) -> Result<Vec<DateTime<Utc>>> {
        let lower = buckets.lower(bucket);
        let width_us = buckets
            .duration(bucket)
            .num_microseconds()
            .expect("bucket width fits in microseconds");

        for _ in 0..MAX_PLACEMENT_DRAWS {
            let mut times: Vec<DateTime<Utc>> = placement(slices, rng)
                .into_iter()
                .map(|frac| lower + Duration::microseconds((width_us as f64 * frac).round() as i64))
                .collect();
            times.sort();

            let distinct = times.len() == slices && times.windows(2).all(|w| w[0] != w[1]);
            let off_bounds = times.iter().all(|t| !buckets.is_bound(*t));
            if distinct && off_bounds {
                return Ok(times);
            }
        }
        Err(ScheduleError::PlacementSampling { bucket, slices })
    }

    /// All event timestamps in order
    pub fn events(&self) -> &[DateTime<Utc>] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sampled decision times of one bucket
    pub fn decision_times(&self, bucket: usize) -> &[DateTime<Utc>] {
        &self.decision_times[bucket]
    }

    /// Classify a timeline timestamp: a sampled decision time is an order
    /// placement, anything else is a bucket bound.
    pub fn classify(&self, t: DateTime<Utc>) -> EventKind {
        if self.decision_index.binary_search(&t).is_ok() {
            EventKind::OrderPlacement
        } else {
            EventKind::BucketBound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 21, 10, 0, 0).unwrap()
    }

    fn make_timeline(seed: u64, slices: usize) -> (BucketSet, Timeline) {
        let mut rng = StdRng::seed_from_u64(seed);
        let buckets =
            BucketSet::build(t0(), t0() + Duration::minutes(5), None, &mut rng).unwrap();
        let timeline =
            Timeline::sample(&buckets, slices, &default_placement, &mut rng).unwrap();
        (buckets, timeline)
    }

    #[test]
    fn test_decision_times_distinct_and_off_bounds() {
        for seed in 0..10 {
            let (buckets, timeline) = make_timeline(seed, 3);
            for bucket in 0..buckets.n_buckets() {
                let times = timeline.decision_times(bucket);
                assert_eq!(times.len(), 3);
                for w in times.windows(2) {
                    assert!(w[0] < w[1]);
                }
                for t in times {
                    assert!(!buckets.is_bound(*t));
                    assert_eq!(timeline.classify(*t), EventKind::OrderPlacement);
                }
            }
        }
    }

    #[test]
    fn test_events_sorted_and_deduplicated() {
        let (buckets, timeline) = make_timeline(3, 4);
        let events = timeline.events();
        for w in events.windows(2) {
            assert!(w[0] < w[1]);
        }
        // every bound except the start is an event, classified as such
        for bound in &buckets.bounds()[1..] {
            assert_eq!(timeline.classify(*bound), EventKind::BucketBound);
        }
        assert_eq!(
            events.len(),
            buckets.n_buckets() * 4 + buckets.n_buckets()
        );
        // the start bound is not an event
        assert!(!events.contains(&t0()));
    }

    #[test]
    fn test_sampling_is_seed_deterministic() {
        let (_, a) = make_timeline(11, 5);
        let (_, b) = make_timeline(11, 5);
        assert_eq!(a.events(), b.events());
    }

    #[test]
    fn test_degenerate_placement_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let buckets =
            BucketSet::build(t0(), t0() + Duration::minutes(5), None, &mut rng).unwrap();
        // constant fractions can never be pairwise distinct for 2+ slices
        let constant: &PlacementFn = &|slices, _rng| vec![0.5; slices];
        let err = Timeline::sample(&buckets, 2, constant, &mut rng);
        assert!(matches!(
            err,
            Err(ScheduleError::PlacementSampling { slices: 2, .. })
        ));
    }
}
