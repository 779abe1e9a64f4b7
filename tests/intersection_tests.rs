//! Queue simulator, signal cycle and full simulation runs

use fuzzy_signal::simulation::{
    catalog, clamp_green, find_scenario, Axis, ConfigError, Direction, FixedTimePolicy,
    FuzzyDecisionPolicy, PerDirection, PolicyKind, ScenarioError, ScenarioSpec, SignalPhase,
    SimWorld, SimulationConfig, StepOutcome, TimingPolicy, TrafficSnapshot, MAX_ARRIVAL_RATE,
    MAX_DELTA, MAX_GREEN, MIN_GREEN,
};

fn scenario(key: &str, duration: f64) -> ScenarioSpec {
    find_scenario(key)
        .expect("built-in scenario")
        .with_duration(duration)
        .expect("valid duration")
}

fn run_all(world: &mut SimWorld) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();
    while !world.is_finished() {
        outcomes.push(world.tick());
    }
    outcomes
}

/// Consecutive (phase, steps) runs; the trailing run may be cut short
fn phase_runs(outcomes: &[StepOutcome]) -> Vec<(SignalPhase, usize)> {
    let mut runs: Vec<(SignalPhase, usize)> = Vec::new();
    for outcome in outcomes {
        match runs.last_mut() {
            Some((phase, steps)) if *phase == outcome.phase => *steps += 1,
            _ => runs.push((outcome.phase, 1)),
        }
    }
    runs
}

struct ConstantPolicy(f64);

impl TimingPolicy for ConstantPolicy {
    fn name(&self) -> &str {
        "constant"
    }

    fn decide(&self, _axis: Axis, _snapshot: &TrafficSnapshot) -> f64 {
        self.0
    }
}

#[test]
fn test_catalog_scenarios_are_valid() {
    let scenarios = catalog();
    assert_eq!(scenarios.len(), 9);
    for spec in &scenarios {
        assert!(spec.validate().is_ok(), "{} failed validation", spec.key());
        assert!(spec.total_arrival_rate() > 0.0);
    }
    let mut keys: Vec<&str> = scenarios.iter().map(|spec| spec.key()).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), 9, "scenario keys must be unique");

    let morning = find_scenario("morning").unwrap();
    assert_eq!(morning.duration(), 7200.0);
    assert_eq!(morning.arrival_rate(Direction::North), 30.0);
    assert_eq!(morning.truncated(1800.0).duration(), 1800.0);
    assert_eq!(find_scenario("light").unwrap().truncated(7200.0).duration(), 3600.0);
}

#[test]
fn test_scenario_errors() {
    assert!(matches!(
        find_scenario("gridlock"),
        Err(ScenarioError::NotFound { .. })
    ));
    assert_eq!(
        ScenarioSpec::uniform("x", "", 5.0, 60.0),
        Err(ScenarioError::EmptyName)
    );
    assert!(matches!(
        ScenarioSpec::new("x", "X", "", PerDirection([5.0, -1.0, 5.0, 5.0]), 60.0),
        Err(ScenarioError::InvalidRate {
            direction: Direction::South,
            ..
        })
    ));
    assert!(find_scenario("normal").unwrap().with_duration(0.0).is_err());
    assert!(find_scenario("normal").unwrap().with_duration(f64::NAN).is_err());
}

#[test]
fn test_config_validation() {
    assert!(SimulationConfig::default().validate().is_ok());
    assert_eq!(
        SimulationConfig::default().with_delta(0.0).validate(),
        Err(ConfigError::InvalidDelta(0.0))
    );
    let config = SimulationConfig {
        fixed_green: 5.0,
        ..SimulationConfig::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::FixedGreenOutOfRange(5.0)));

    let result = SimWorld::with_policy(
        &scenario("normal", 60.0),
        PolicyKind::Fixed,
        &SimulationConfig::default().with_delta(-1.0),
    );
    assert!(result.is_err());
}

#[test]
fn test_clearance_intervals_must_be_positive() {
    let config = SimulationConfig {
        all_red_time: 0.0,
        ..SimulationConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::InvalidClearance {
            name: "all_red",
            value: 0.0
        })
    );
    let config = SimulationConfig {
        yellow_time: 0.0,
        ..SimulationConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidClearance { name: "yellow", .. })
    ));
    assert!(SimWorld::with_policy(&scenario("normal", 60.0), PolicyKind::Fixed, &config).is_err());
}

#[test]
fn test_arrival_rate_and_step_are_bounded() {
    assert!(matches!(
        ScenarioSpec::uniform("huge", "Huge", 1e12, 10.0),
        Err(ScenarioError::RateTooHigh {
            direction: Direction::North,
            ..
        })
    ));
    assert!(ScenarioSpec::uniform("huge", "Huge", MAX_ARRIVAL_RATE + 1.0, 10.0).is_err());
    assert_eq!(
        SimulationConfig::default().with_delta(MAX_DELTA + 1.0).validate(),
        Err(ConfigError::InvalidDelta(MAX_DELTA + 1.0))
    );

    // The largest accepted rate at the largest step fills every draw
    let flood = ScenarioSpec::uniform("flood", "Flood", MAX_ARRIVAL_RATE, 300.0).unwrap();
    let config = SimulationConfig::default().with_delta(MAX_DELTA);
    let mut world = SimWorld::with_policy(&flood, PolicyKind::Fixed, &config).unwrap();
    let outcomes = run_all(&mut world);
    assert_eq!(outcomes.len(), 5);
    for outcome in &outcomes {
        assert!(outcome.arrivals.values().all(|&a| a == 600));
    }
}

#[test]
fn test_snapshot_scaling() {
    let snapshot = TrafficSnapshot::from_queues(
        12.0,
        PerDirection([10, 60, 0, 25]),
        PerDirection([15.0, 500.0, 0.0, -3.0]),
        2.0,
    );
    assert_eq!(snapshot.density[Direction::North], 20.0);
    assert_eq!(snapshot.density[Direction::South], 100.0);
    assert_eq!(snapshot.waiting[Direction::South], 300.0);
    assert_eq!(snapshot.waiting[Direction::West], 0.0);
    assert_eq!(snapshot.cross_density(Direction::North), 25.0);
    assert_eq!(snapshot.cross_density(Direction::East), 60.0);
    assert_eq!(snapshot.total_queue(), 95);
}

#[test]
fn test_green_clamping() {
    assert_eq!(clamp_green(3.0), MIN_GREEN);
    assert_eq!(clamp_green(250.0), MAX_GREEN);
    assert_eq!(clamp_green(f64::NAN), MIN_GREEN);
    assert_eq!(FixedTimePolicy::new(0.0).green(), MIN_GREEN);
    assert_eq!(FixedTimePolicy::default().green(), 40.0);

    let config = SimulationConfig::default();
    for (decision, expected) in [(500.0, MAX_GREEN), (-3.0, MIN_GREEN), (f64::NAN, MIN_GREEN)] {
        let mut world = SimWorld::new(
            &scenario("normal", 600.0),
            Box::new(ConstantPolicy(decision)),
            &config,
        )
        .unwrap();
        run_all(&mut world);
        let log = world.controller().green_log();
        assert!(log.len() > 2);
        assert!(log.iter().all(|record| record.duration == expected));
    }
}

#[test]
fn test_fuzzy_policy_reacts_to_queues() {
    let policy = FuzzyDecisionPolicy::new().unwrap();
    let empty = TrafficSnapshot::from_queues(
        0.0,
        PerDirection::splat(0),
        PerDirection::splat(0.0),
        2.0,
    );
    let quiet = policy.decide(Axis::NorthSouth, &empty);
    assert!(quiet < 20.0, "empty intersection got {}", quiet);

    let busy_ns = TrafficSnapshot::from_queues(
        0.0,
        PerDirection([50, 50, 0, 0]),
        PerDirection::splat(0.0),
        2.0,
    );
    let ns = policy.decide(Axis::NorthSouth, &busy_ns);
    let ew = policy.decide(Axis::EastWest, &busy_ns);
    assert!(ns > 50.0, "busy N-S got {}", ns);
    assert!(ew < 20.0, "idle E-W got {}", ew);
    assert!((MIN_GREEN..=MAX_GREEN).contains(&ns));
}

#[test]
fn test_phase_cycle_order_and_lengths() {
    let mut world = SimWorld::with_policy(
        &scenario("normal", 900.0),
        PolicyKind::Fixed,
        &SimulationConfig::default(),
    )
    .unwrap();
    let outcomes = run_all(&mut world);
    let runs = phase_runs(&outcomes);
    assert_eq!(runs[0].0, SignalPhase::NsGreen);

    for pair in runs.windows(2) {
        assert_eq!(pair[1].0, pair[0].0.next(), "out-of-order phase");
    }
    for &(phase, steps) in &runs[..runs.len() - 1] {
        let expected = match phase {
            SignalPhase::NsGreen | SignalPhase::EwGreen => 40,
            SignalPhase::NsYellow | SignalPhase::EwYellow => 3,
            SignalPhase::AllRed1 | SignalPhase::AllRed2 => 2,
        };
        assert_eq!(steps, expected, "{} lasted {} steps", phase.label(), steps);
    }
    // 90 s per cycle
    assert_eq!(world.controller().cycles(), 10);
}

#[test]
fn test_fuzzy_greens_match_granted_durations() {
    let mut world = SimWorld::with_policy(
        &scenario("rush_ns", 1200.0),
        PolicyKind::Fuzzy,
        &SimulationConfig::default(),
    )
    .unwrap();
    let outcomes = run_all(&mut world);
    let greens: Vec<usize> = phase_runs(&outcomes)
        .into_iter()
        .filter(|(phase, _)| phase.is_green())
        .map(|(_, steps)| steps)
        .collect();
    let log = world.controller().green_log();
    assert!(log.len() >= greens.len());

    for (record, &steps) in log.iter().zip(&greens[..greens.len() - 1]) {
        assert!((MIN_GREEN..=MAX_GREEN).contains(&record.duration));
        let steps = steps as f64;
        assert!(
            steps >= record.duration - 1e-9 && steps < record.duration + 1.0,
            "green of {:.2}s ran {} steps",
            record.duration,
            steps
        );
    }
    assert_eq!(log[0].axis, Axis::NorthSouth);
    assert_eq!(log[0].start, 0.0);
}

#[test]
fn test_departures_only_on_green() {
    let mut world = SimWorld::with_policy(
        &scenario("peak", 1200.0),
        PolicyKind::Fuzzy,
        &SimulationConfig::default(),
    )
    .unwrap();
    for outcome in run_all(&mut world) {
        for direction in Direction::ALL {
            let departed = outcome.departures[direction];
            if !outcome.phase.allows_departure(direction) {
                assert_eq!(departed, 0, "{} departed on {}", direction, outcome.phase.label());
            }
            // Saturation flow of 2 veh/s with a 1 s step
            assert!(departed <= 2);
            assert_eq!(outcome.waits[direction].len(), departed as usize);
            assert!(outcome.waits[direction].iter().all(|&wait| wait >= 0.0));
        }
    }
}

#[test]
fn test_vehicles_are_conserved() {
    let mut world = SimWorld::with_policy(
        &scenario("asymmetric_north", 1500.0),
        PolicyKind::Fuzzy,
        &SimulationConfig::default(),
    )
    .unwrap();
    while !world.is_finished() {
        world.tick();
        for direction in Direction::ALL {
            let queue = world.simulator().queue(direction);
            assert_eq!(queue.arrived(), queue.departed() + queue.len() as u64);
        }
    }

    let report = world.report();
    assert_eq!(
        report.total_arrivals,
        report.total_departures + report.vehicles_in_system
    );
    assert_eq!(
        report.vehicles_in_system,
        world.simulator().total_queued() as u64
    );
    assert!(report.total_departures > 0);
}

#[test]
fn test_waiting_time_matches_queue_integral() {
    for delta in [1.0, 0.5] {
        let config = SimulationConfig::default().with_delta(delta);
        let mut world =
            SimWorld::with_policy(&scenario("weekend", 900.0), PolicyKind::Fuzzy, &config)
                .unwrap();
        let outcomes = run_all(&mut world);

        let queue_integral: f64 = outcomes
            .iter()
            .map(|outcome| outcome.queue_lengths.values().sum::<usize>() as f64 * delta)
            .sum();
        let departed_wait: f64 = outcomes
            .iter()
            .flat_map(|outcome| outcome.waits.values().flatten().copied())
            .sum();
        let now = world.time();
        let still_queued: f64 = Direction::ALL
            .iter()
            .map(|&direction| world.simulator().queue(direction).queued_age(now))
            .sum();

        assert!(
            (departed_wait + still_queued - queue_integral).abs() < 1e-6 * queue_integral.max(1.0),
            "dt={}: waits {} + queued {} != integral {}",
            delta,
            departed_wait,
            still_queued,
            queue_integral
        );
        assert!((world.report().total_delay - departed_wait).abs() < 1e-6 * departed_wait.max(1.0));
    }
}

#[test]
fn test_fractional_time_step() {
    let config = SimulationConfig::default().with_delta(0.5);
    let mut world =
        SimWorld::with_policy(&scenario("normal", 100.0), PolicyKind::Fixed, &config).unwrap();
    let outcomes = run_all(&mut world);
    assert_eq!(outcomes.len(), 200);
    assert_eq!(world.simulator().clock().steps(), 200);
    assert!((world.time() - 100.0).abs() < 1e-9);

    // 40 s green, then 3 s of yellow at half-second steps
    let runs = phase_runs(&outcomes);
    assert_eq!(runs[0], (SignalPhase::NsGreen, 80));
    assert_eq!(runs[1], (SignalPhase::NsYellow, 6));
    assert_eq!(runs[2], (SignalPhase::AllRed1, 4));
    assert!(outcomes
        .iter()
        .all(|outcome| outcome.departures.values().all(|&d| d <= 1)));
}

#[test]
fn test_high_rate_splits_arrival_draws() {
    let burst = ScenarioSpec::uniform("burst", "Burst", 90.0, 600.0).unwrap();
    let mut world =
        SimWorld::with_policy(&burst, PolicyKind::Fixed, &SimulationConfig::default()).unwrap();
    let outcomes = run_all(&mut world);
    assert!(outcomes
        .iter()
        .all(|outcome| outcome.arrivals.values().all(|&a| a <= 2)));

    // 1.5 expected arrivals per step per approach
    let report = world.report();
    for direction in Direction::ALL {
        let arrivals = report.by_direction[direction].arrivals;
        assert!(
            (800..=1000).contains(&arrivals),
            "{} saw {} arrivals",
            direction,
            arrivals
        );
    }
}

#[test]
fn test_same_seed_reproduces_run() {
    let config = SimulationConfig::default();
    let normal = scenario("normal", 1800.0);
    let first = SimWorld::with_policy(&normal, PolicyKind::Fuzzy, &config)
        .unwrap()
        .run();
    let second = SimWorld::with_policy(&normal, PolicyKind::Fuzzy, &config)
        .unwrap()
        .run();
    assert_eq!(first, second);

    let other = SimWorld::with_policy(&normal, PolicyKind::Fuzzy, &config.clone().with_seed(7))
        .unwrap()
        .run();
    assert_ne!(first, other);
}

#[test]
fn test_report_is_consistent() {
    let report = SimWorld::with_policy(
        &scenario("rush_ew", 1800.0),
        PolicyKind::Fuzzy,
        &SimulationConfig::default(),
    )
    .unwrap()
    .run();

    assert_eq!(report.policy, "fuzzy");
    assert_eq!(report.simulation_duration, 1800.0);
    assert!(report.fairness_index > 0.0 && report.fairness_index <= 1.0);
    assert!(report.waiting_fairness_index > 0.0 && report.waiting_fairness_index <= 1.0);
    assert!((0.0..=1.0).contains(&report.utilization_rate));
    assert!(report.max_waiting_time >= report.average_waiting_time);
    assert!(report.max_queue_length as f64 >= report.average_queue_length);
    assert!((report.throughput_per_hour - report.total_departures as f64 * 2.0).abs() < 1e-6);
    assert!(report.average_green_time >= MIN_GREEN && report.average_green_time <= MAX_GREEN);

    let departures: u64 = report.by_direction.values().map(|d| d.departures).sum();
    assert_eq!(departures, report.total_departures);
    // Heavy east-west demand earns the longer greens
    assert!(
        report.by_direction[Direction::East].avg_green_time
            > report.by_direction[Direction::North].avg_green_time
    );
}
