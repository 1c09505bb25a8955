//! Time Bucketing
//!
//! Carves the parent order's execution horizon into buckets. The bucket
//! width follows the order duration: very short orders get fine-grained
//! buckets, long orders coarse ones. Bounds can be jittered by a per-bucket
//! random percentage to avoid a perfectly regular footprint.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;

use crate::error::{Result, ScheduleError};

/// Canonical bucket width for a given parent-order duration.
///
/// Durations up to 5 minutes use per-minute widths, mid-range durations a
/// flat width, and anything over 30 minutes is keyed by its ceiling hour
/// capped at 4h. Note the hour key is `floor(minutes/60) + 1`: a 60-minute
/// order lands on the 2h width.
fn canonical_width(duration: Duration) -> Duration {
    let minutes = duration.num_milliseconds() as f64 / 60_000.0;
    let millis: i64 = if minutes > 30.0 {
        let hours = ((minutes / 60.0).floor() as i64 + 1).min(4);
        match hours {
            1 => 300_000,
            2 => 600_000,
            3 => 900_000,
            _ => 1_200_000,
        }
    } else if minutes > 10.0 {
        180_000
    } else if minutes > 5.0 {
        60_000
    } else {
        match minutes.ceil() as i64 {
            m if m <= 1 => 7_000,
            2 => 15_000,
            3 => 22_500,
            4 => 24_000,
            _ => 30_000,
        }
    };
    Duration::milliseconds(millis)
}

/// Ordered, strictly increasing bucket bounds over the execution horizon.
///
/// Bucket `i` spans `[bounds[i], bounds[i+1])`. The first bound is the
/// parent order's start time, the last its end time; every bucket except the
/// final one has the canonical width (plus jitter), the final one absorbs
/// whatever remains.
#[derive(Debug, Clone)]
pub struct BucketSet {
    bounds: Vec<DateTime<Utc>>,
    width: Duration,
}

impl BucketSet {
    /// Construct bucket bounds for `[start, end)`.
    ///
    /// `rand_width` is the maximum jitter as an integer percentage of the
    /// canonical width; when set, each bucket's step is scaled by a factor
    /// drawn uniformly from `[1 - w/100, 1 + w/100]`.
    pub fn build(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rand_width: Option<u32>,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if end < start {
            return Err(ScheduleError::EndBeforeStart {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        let width = canonical_width(end - start);
        let width_ms = width.num_milliseconds();

        let mut bounds = vec![start];
        while *bounds.last().expect("bounds never empty") < end {
            let jitter_pct: i64 = match rand_width {
                Some(w) if w > 0 => rng.gen_range(-(w as i64)..=w as i64),
                _ => 0,
            };
            // keep bounds strictly increasing even at 100% downward jitter
            let step_ms = (width_ms * (100 + jitter_pct) / 100).max(1);
            let last = *bounds.last().expect("bounds never empty");
            bounds.push(last + Duration::milliseconds(step_ms));
        }

        // drop the bound that overshot, then close on the end time exactly
        if *bounds.last().expect("bounds never empty") >= end {
            bounds.pop();
        }
        bounds.push(end);

        Ok(Self { bounds, width })
    }

    /// All bounds, start and end inclusive
    pub fn bounds(&self) -> &[DateTime<Utc>] {
        &self.bounds
    }

    /// Number of buckets (one less than the number of bounds)
    pub fn n_buckets(&self) -> usize {
        self.bounds.len() - 1
    }

    /// Canonical (un-jittered) bucket width
    pub fn width(&self) -> Duration {
        self.width
    }

    /// Lower bound of bucket `i`
    pub fn lower(&self, i: usize) -> DateTime<Utc> {
        self.bounds[i]
    }

    /// Upper bound of bucket `i`
    pub fn upper(&self, i: usize) -> DateTime<Utc> {
        self.bounds[i + 1]
    }

    /// Duration of bucket `i`
    pub fn duration(&self, i: usize) -> Duration {
        self.upper(i) - self.lower(i)
    }

    /// Duration of the whole horizon
    pub fn total_duration(&self) -> Duration {
        *self.bounds.last().expect("bounds never empty") - self.bounds[0]
    }

    /// True if `t` lies exactly on any bound
    pub fn is_bound(&self, t: DateTime<Utc>) -> bool {
        self.bounds.binary_search(&t).is_ok()
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

    fn build(minutes: i64, rand_width: Option<u32>, seed: u64) -> BucketSet {
        let mut rng = StdRng::seed_from_u64(seed);
        BucketSet::build(t0(), t0() + Duration::minutes(minutes), rand_width, &mut rng).unwrap()
    }

    #[test]
    fn test_canonical_widths() {
        assert_eq!(canonical_width(Duration::minutes(1)).num_seconds(), 7);
        assert_eq!(canonical_width(Duration::seconds(90)).num_seconds(), 15);
        assert_eq!(
            canonical_width(Duration::minutes(3)).num_milliseconds(),
            22_500
        );
        assert_eq!(canonical_width(Duration::minutes(4)).num_seconds(), 24);
        assert_eq!(canonical_width(Duration::minutes(5)).num_seconds(), 30);
        assert_eq!(canonical_width(Duration::minutes(10)).num_seconds(), 60);
        assert_eq!(canonical_width(Duration::minutes(30)).num_seconds(), 180);
        assert_eq!(canonical_width(Duration::minutes(45)).num_seconds(), 300);
        // the ceiling-hour key maps a full hour onto the 2h width
        assert_eq!(canonical_width(Duration::minutes(60)).num_seconds(), 600);
        assert_eq!(canonical_width(Duration::hours(4)).num_seconds(), 1200);
        // anything at or beyond 4h stays on the 4h width
        assert_eq!(canonical_width(Duration::hours(9)).num_seconds(), 1200);
    }

    #[test]
    fn test_bounds_cover_horizon_exactly() {
        let set = build(5, None, 0);
        let bounds = set.bounds();
        assert_eq!(bounds[0], t0());
        assert_eq!(*bounds.last().unwrap(), t0() + Duration::minutes(5));
        // 5m horizon at 30s width: 10 buckets
        assert_eq!(set.n_buckets(), 10);
        for w in bounds.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn test_jittered_bounds_still_increasing_and_closed() {
        for seed in 0..20 {
            let set = build(10, Some(30), seed);
            let bounds = set.bounds();
            assert_eq!(bounds[0], t0());
            assert_eq!(*bounds.last().unwrap(), t0() + Duration::minutes(10));
            for w in bounds.windows(2) {
                assert!(w[0] < w[1], "bounds must be strictly increasing");
            }
        }
    }

    #[test]
    fn test_jitter_is_seed_deterministic() {
        let a = build(10, Some(25), 7);
        let b = build(10, Some(25), 7);
        assert_eq!(a.bounds(), b.bounds());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = BucketSet::build(t0(), t0() - Duration::seconds(1), None, &mut rng);
        assert!(matches!(err, Err(ScheduleError::EndBeforeStart { .. })));
    }

    #[test]
    fn test_final_bucket_absorbs_remainder() {
        // 4m10s horizon at 30s width: 8 whole buckets plus a 10s tail
        let mut rng = StdRng::seed_from_u64(0);
        let end = t0() + Duration::seconds(250);
        let set = BucketSet::build(t0(), end, None, &mut rng).unwrap();
        assert_eq!(set.n_buckets(), 9);
        assert_eq!(set.duration(set.n_buckets() - 1), Duration::seconds(10));
    }
}
