//! Observation Builder
//!
//! Encodes the market state at an event into a flat feature vector: a
//! window of past book snapshots (prices and volumes, optionally min-max
//! rescaled across the window) followed by the adaptive track's private
//! state, the fraction of the current bucket's volume still to trade and
//! the number of order placements left in it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use hermes_core::BookSnapshot;
use hermes_ports::DataFeed;
use hermes_schedule::Schedule;

use crate::config::ObsConfig;
use crate::error::Result;

/// Fixed observation length for a config: four ladders per snapshot plus
/// the two schedule features
pub fn observation_len(config: &ObsConfig) -> usize {
    config.nr_of_lobs * config.lob_depth * 4 + 2
}

/// Build the observation at `event_time`.
///
/// The feed cursor is repositioned to the event; the snapshot window is
/// left-padded by repeating the oldest available snapshot when the replay
/// has not yet accumulated `nr_of_lobs` entries.
pub fn build_observation<F: DataFeed>(
    event_time: DateTime<Utc>,
    feed: &mut F,
    config: &ObsConfig,
    schedule: &Schedule,
    bucket_idx: usize,
) -> Result<Vec<f64>> {
    feed.reset(event_time);
    feed.next_snapshot()?;
    let (_, mut books) = feed.past_snapshots(config.nr_of_lobs)?;
    while books.len() < config.nr_of_lobs {
        let oldest = books.first().cloned().unwrap_or_default();
        books.insert(0, oldest);
    }

    let mut prices = Vec::with_capacity(config.nr_of_lobs * config.lob_depth * 2);
    let mut volumes = Vec::with_capacity(config.nr_of_lobs * config.lob_depth * 2);
    for book in &books {
        let (book_prices, book_volumes) = ladder_features(book, config.lob_depth);
        prices.extend(book_prices);
        volumes.extend(book_volumes);
    }

    if config.norm {
        min_max_rescale(&mut prices);
        min_max_rescale(&mut volumes);
    }

    let bucket_volume = schedule.bucket_volume(bucket_idx);
    let remaining = schedule.bucket_vol_remaining(bucket_idx);
    let vol_feature = if config.norm && !bucket_volume.is_zero() {
        (remaining / bucket_volume).to_f64().unwrap_or(0.0)
    } else {
        remaining.to_f64().unwrap_or(0.0)
    };
    let slices_left = schedule
        .no_of_slices()
        .saturating_sub(schedule.slice_idx() + 1) as f64;

    let mut observation = prices;
    observation.append(&mut volumes);
    observation.push(vol_feature);
    observation.push(slices_left);
    Ok(observation)
}

/// Top-of-book ladders of one snapshot: bid prices ascending then ask
/// prices ascending, zero-padded to `depth`, with their level volumes
fn ladder_features(book: &BookSnapshot, depth: usize) -> (Vec<f64>, Vec<f64>) {
    let mut bids = book.top_bids(depth);
    bids.reverse(); // ascending, best bid last
    let asks = book.top_asks(depth);

    let mut prices = Vec::with_capacity(depth * 2);
    let mut volumes = Vec::with_capacity(depth * 2);

    let pad = depth.saturating_sub(bids.len());
    prices.extend(std::iter::repeat_n(0.0, pad));
    volumes.extend(std::iter::repeat_n(0.0, pad));
    for (price, volume) in &bids {
        prices.push(to_f64(*price));
        volumes.push(to_f64(*volume));
    }
    for (price, volume) in &asks {
        prices.push(to_f64(*price));
        volumes.push(to_f64(*volume));
    }
    let pad = depth.saturating_sub(asks.len());
    prices.extend(std::iter::repeat_n(0.0, pad));
    volumes.extend(std::iter::repeat_n(0.0, pad));

    (prices, volumes)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// In-place `(x - min) / (max - min)`; a flat array rescales to zeros
fn min_max_rescale(values: &mut [f64]) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        values.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    for v in values.iter_mut() {
        *v = (*v - min) / range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use hermes_broker::ReplayFeed;
    use hermes_core::{ParentOrder, Side};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 21, 10, 0, 0).unwrap()
    }

    fn make_schedule() -> Schedule {
        let parent = ParentOrder::new(Side::Buy, dec!(500), t0(), t0() + Duration::minutes(5));
        let mut rng = StdRng::seed_from_u64(3);
        Schedule::twap(
            parent,
            3,
            None,
            dec!(1),
            &hermes_schedule::default_placement,
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn test_observation_has_fixed_length() {
        let config = ObsConfig::default();
        let mut feed = ReplayFeed::random_walk(t0(), 120, Duration::seconds(1), 9);
        let schedule = make_schedule();

        let obs =
            build_observation(t0() + Duration::seconds(60), &mut feed, &config, &schedule, 0)
                .unwrap();
        assert_eq!(obs.len(), observation_len(&config));
        // early in the replay the window is padded, length must not change
        let obs = build_observation(t0(), &mut feed, &config, &schedule, 0).unwrap();
        assert_eq!(obs.len(), observation_len(&config));
    }

    #[test]
    fn test_normalized_features_in_unit_range() {
        let config = ObsConfig::default();
        let mut feed = ReplayFeed::random_walk(t0(), 120, Duration::seconds(1), 5);
        let schedule = make_schedule();

        let obs =
            build_observation(t0() + Duration::seconds(90), &mut feed, &config, &schedule, 0)
                .unwrap();
        let ladders = &obs[..obs.len() - 2];
        assert!(ladders.iter().all(|v| (0.0..=1.0).contains(v)));
        // nothing traded yet: the full bucket is remaining
        assert_eq!(obs[obs.len() - 2], 1.0);
        // all slices still ahead
        assert_eq!(obs[obs.len() - 1], 2.0);
    }

    #[test]
    fn test_unnormalized_keeps_absolute_remaining() {
        let config = ObsConfig {
            norm: false,
            ..ObsConfig::default()
        };
        let mut feed = ReplayFeed::random_walk(t0(), 120, Duration::seconds(1), 5);
        let schedule = make_schedule();

        let obs =
            build_observation(t0() + Duration::seconds(90), &mut feed, &config, &schedule, 2)
                .unwrap();
        let expected = schedule.bucket_vol_remaining(2).to_f64().unwrap();
        assert_eq!(obs[obs.len() - 2], expected);
    }
}
