//! Full-episode integration: both tracks advance in lockstep over a
//! synthetic replay until termination.

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use hermes_broker::ReplayFeed;
use hermes_env::{
    Action, ActionMapping, EnvConfig, ExecutionEnv, RewardPolicy, SimError,
    observation::observation_len,
};
use hermes_schedule::ScheduleKind;

fn make_feed(seed: u64) -> ReplayFeed {
    let t0 = Utc.with_ymd_and_hms(2021, 6, 21, 10, 0, 0).unwrap();
    ReplayFeed::random_walk(t0, 460, Duration::seconds(1), seed)
}

fn make_config(seed: u64) -> EnvConfig {
    let mut config = EnvConfig::default();
    config.seed = seed;
    config.trade.vol_low = 300;
    config.trade.vol_high = 500;
    config.trade.no_slices_low = 2;
    config.trade.no_slices_high = 3;
    config.start.hour_low = 10;
    config.start.hour_high = 10;
    config.start.minute_low = 0;
    config.start.minute_high = 0;
    config.start.second_low = 0;
    config.start.second_high = 30;
    config.exec.exec_times = vec![5];
    config
}

#[test]
fn test_episode_runs_to_termination_in_lockstep() {
    let env = ExecutionEnv::new(make_feed(4), make_config(4)).unwrap();
    let mut env = env
        .with_action_mapping(ActionMapping::Discrete)
        .with_reward_policy(RewardPolicy::PctPerBucket);

    let observation = env.reset().unwrap();
    assert_eq!(observation.len(), observation_len(&env.config().obs));

    let expected_steps = {
        let benchmark = env.benchmark().unwrap();
        benchmark.buckets().n_buckets() * benchmark.no_of_slices()
    };

    let mut steps = 0;
    loop {
        let result = env.step(Action::Discrete(1)).unwrap();
        steps += 1;
        assert!(result.reward.is_finite());
        assert_eq!(result.observation.len(), observation.len());
        if result.done {
            break;
        }
        assert!(steps <= expected_steps, "episode failed to terminate");
    }
    assert_eq!(steps, expected_steps);

    // both tracks realized their parent volume within one tick
    let tick = env.benchmark().unwrap().tick_size();
    for schedule in [env.benchmark().unwrap(), env.adaptive().unwrap()] {
        assert!(schedule.vol_remaining().abs() <= tick);
        assert_eq!(schedule.bucket_idx(), schedule.buckets().n_buckets());
    }

    // episode VWAPs are attached at termination
    assert!(env.benchmark_vwap().is_some());
    assert!(env.adaptive_vwap().is_some());
    assert!(!env.broker().fills(ScheduleKind::Benchmark).is_empty());
    assert!(!env.broker().fills(ScheduleKind::Adaptive).is_empty());
}

#[test]
fn test_identical_seeds_reproduce_the_episode() {
    let run = |seed| {
        let env = ExecutionEnv::new(make_feed(seed), make_config(seed)).unwrap();
        let mut env = env.with_action_mapping(ActionMapping::Discrete);
        env.reset().unwrap();
        let timeline = env.benchmark().unwrap().timeline().events().to_vec();
        let bounds = env.benchmark().unwrap().buckets().bounds().to_vec();
        let mut rewards = Vec::new();
        loop {
            let result = env.step(Action::Discrete(2)).unwrap();
            rewards.push(result.reward.to_bits());
            if result.done {
                break;
            }
        }
        let fills: Vec<(Decimal, Decimal)> = env
            .broker()
            .fills(ScheduleKind::Adaptive)
            .iter()
            .map(|f| (f.price, f.quantity))
            .collect();
        (timeline, bounds, rewards, fills)
    };

    assert_eq!(run(17), run(17));
}

#[test]
fn test_oversized_action_is_clipped_to_bucket_remaining() {
    let env = ExecutionEnv::new(make_feed(6), make_config(6)).unwrap();
    let mut env = env.with_action_mapping(ActionMapping::Raw);
    env.reset().unwrap();

    let bucket_volume = env.benchmark().unwrap().bucket_volume(0);
    env.step(Action::Continuous(1e9)).unwrap();
    // clipped exactly to the bucket's remaining volume, not a unit more
    assert_eq!(env.adaptive().unwrap().allocation(0, 0), bucket_volume);

    // oversized decisions all the way down still keep the accounting legal
    loop {
        let adaptive = env.adaptive().unwrap();
        let cell = adaptive.allocation(adaptive.bucket_idx(), adaptive.slice_idx());
        assert!(cell <= adaptive.current_bucket_remaining());
        if env.step(Action::Continuous(1e9)).unwrap().done {
            break;
        }
    }
    let adaptive = env.adaptive().unwrap();
    let tick = adaptive.tick_size();
    assert!(adaptive.vol_remaining() >= -tick);
    for bucket in 0..adaptive.buckets().n_buckets() {
        assert!(adaptive.bucket_vol_remaining(bucket) >= -tick);
    }
}

#[test]
fn test_invalid_discrete_action_fails_without_advancing() {
    let env = ExecutionEnv::new(make_feed(8), make_config(8)).unwrap();
    let mut env = env.with_action_mapping(ActionMapping::Discrete);
    env.reset().unwrap();

    let err = env.step(Action::Discrete(3));
    assert!(matches!(err, Err(SimError::InvalidAction(3))));

    // the episode is still stepable after the rejected action
    let result = env.step(Action::Discrete(0)).unwrap();
    assert!(!result.done);
}

#[test]
fn test_step_before_reset_is_rejected() {
    let env = ExecutionEnv::new(make_feed(9), make_config(9)).unwrap();
    let mut env = env.with_action_mapping(ActionMapping::Discrete);
    let err = env.step(Action::Discrete(1));
    assert!(matches!(err, Err(SimError::EpisodeNotRunning)));
}

#[test]
fn test_step_after_termination_is_rejected() {
    let env = ExecutionEnv::new(make_feed(10), make_config(10)).unwrap();
    let mut env = env.with_action_mapping(ActionMapping::Discrete);
    env.reset().unwrap();
    loop {
        if env.step(Action::Discrete(1)).unwrap().done {
            break;
        }
    }
    let err = env.step(Action::Discrete(1));
    assert!(matches!(err, Err(SimError::EpisodeNotRunning)));

    // a fresh reset revives the coordinator
    env.reset().unwrap();
    assert!(!env.step(Action::Discrete(1)).unwrap().done);
}

#[test]
fn test_dollar_reward_policies_run_a_full_episode() {
    for policy in [
        RewardPolicy::SignPerStep,
        RewardPolicy::DollarPerStep,
        RewardPolicy::DollarVolumePerBucket,
        RewardPolicy::PctPerEpisode,
    ] {
        let env = ExecutionEnv::new(make_feed(12), make_config(12)).unwrap();
        let mut env = env
            .with_action_mapping(ActionMapping::Discrete)
            .with_reward_policy(policy);
        env.reset().unwrap();
        let final_reward = loop {
            let result = env.step(Action::Discrete(1)).unwrap();
            assert!(result.reward.is_finite());
            if result.done {
                break result.reward;
            }
        };
        if policy == RewardPolicy::PctPerEpisode {
            // the terminal step carries the episode comparison
            assert!(final_reward.abs() < 1.0);
        }
    }
}
