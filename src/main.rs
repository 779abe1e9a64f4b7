use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use fuzzy_signal::comparison;
use fuzzy_signal::simulation::{
    self, Direction, FuzzyDecisionPolicy, PerDirection, PolicyKind, SimWorld, SimulationConfig,
    TimingPolicy, TrafficSnapshot, DEFAULT_DELTA, DEFAULT_SEED,
};

#[derive(Parser)]
#[command(name = "fuzzy_signal")]
#[command(about = "Fuzzy traffic signal control compared with a fixed-time signal")]
struct Cli {
    /// Seed for the arrival process
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Time delta per tick in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_DELTA)]
    delta: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scenario under one policy
    Run {
        /// Scenario key (see `scenarios`)
        #[arg(long, default_value = "normal")]
        scenario: String,

        #[arg(long, value_enum, default_value_t = PolicyKind::Fuzzy)]
        policy: PolicyKind,

        /// Simulated seconds to run instead of the scenario's own length
        #[arg(long)]
        duration: Option<f64>,

        /// Print the intersection state every N simulated seconds
        #[arg(long)]
        progress: Option<f64>,
    },

    /// Run scenarios under both policies and report the improvement
    Compare {
        /// Scenario keys to compare (all scenarios when omitted)
        #[arg(long = "scenario")]
        scenarios: Vec<String>,

        /// Simulated seconds per run (capped at 1800)
        #[arg(long)]
        duration: Option<f64>,

        /// Write the results as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the built-in scenarios
    Scenarios,

    /// Compute green times for a single traffic state
    Decide {
        /// Queue lengths for north, south, east and west
        #[arg(long, num_args = 4, value_names = ["N", "S", "E", "W"], default_values_t = [0usize, 0, 0, 0])]
        queues: Vec<usize>,

        /// Oldest waiting time in seconds for north, south, east and west
        #[arg(long, num_args = 4, value_names = ["N", "S", "E", "W"], default_values_t = [0.0, 0.0, 0.0, 0.0])]
        waits: Vec<f64>,
    },
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,fuzzy_signal=info"),
    )
    .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = SimulationConfig::default()
        .with_seed(cli.seed)
        .with_delta(cli.delta);
    config.validate().context("Invalid command-line settings")?;

    match cli.command {
        Command::Run {
            scenario,
            policy,
            duration,
            progress,
        } => run_single(&config, &scenario, policy, duration, progress),
        Command::Compare {
            scenarios,
            duration,
            output,
        } => run_comparison(&config, &scenarios, duration, output),
        Command::Scenarios => {
            list_scenarios();
            Ok(())
        }
        Command::Decide { queues, waits } => decide(&config, &queues, &waits),
    }
}

fn load_scenario(key: &str, duration: Option<f64>) -> Result<simulation::ScenarioSpec> {
    let scenario = simulation::find_scenario(key)?;
    match duration {
        Some(duration) => scenario
            .with_duration(duration)
            .with_context(|| format!("Invalid duration for scenario '{}'", key)),
        None => Ok(scenario),
    }
}

/// Run one scenario headless, optionally printing progress
fn run_single(
    config: &SimulationConfig,
    key: &str,
    policy: PolicyKind,
    duration: Option<f64>,
    progress: Option<f64>,
) -> Result<()> {
    let scenario = load_scenario(key, duration)?;
    println!("Running '{}' with the {} policy...", scenario.name(), policy.name());
    println!(
        "Duration: {:.0}s, delta: {}s, seed: {}",
        scenario.duration(),
        config.delta,
        config.seed
    );
    println!();

    let mut world = SimWorld::with_policy(&scenario, policy, config)?;
    let mut next_report = progress.filter(|interval| *interval > 0.0);
    while !world.is_finished() {
        world.tick();
        if let (Some(at), Some(interval)) = (next_report, progress) {
            if world.time() >= at {
                println!("--- After {:.0}s simulated time ---", world.time());
                world.print_summary();
                println!();
                next_report = Some(at + interval);
            }
        }
    }

    let report = world.report();
    info!("=== SIMULATION COMPLETE ===");
    info!("{}", report.summary());
    println!("=== Final State ===");
    world.print_summary();
    println!();
    print_report(&report);
    Ok(())
}

fn print_report(report: &simulation::MetricsReport) {
    println!("  Avg Waiting Time:     {:.2}s", report.average_waiting_time);
    println!("  Max Waiting Time:     {:.2}s", report.max_waiting_time);
    println!("  Avg Queue Length:     {:.2}", report.average_queue_length);
    println!("  Max Queue Length:     {}", report.max_queue_length);
    println!("  Throughput:           {:.1} veh/h", report.throughput_per_hour);
    println!("  Fairness Index:       {:.3}", report.fairness_index);
    println!("  Avg Green Time:       {:.1}s", report.average_green_time);
}

fn run_comparison(
    config: &SimulationConfig,
    keys: &[String],
    duration: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let scenarios = if keys.is_empty() {
        simulation::catalog()
    } else {
        keys.iter()
            .map(|key| load_scenario(key, None))
            .collect::<Result<Vec<_>>>()?
    };
    let scenarios = match duration {
        Some(duration) => scenarios
            .iter()
            .map(|scenario| scenario.with_duration(duration))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid comparison duration")?,
        None => scenarios,
    };

    let results = comparison::compare_all(&scenarios, config)?;
    for result in &results {
        println!("{}", "=".repeat(70));
        println!(
            "{} ({:.0}s): {}",
            result.scenario.name, result.scenario.duration, result.scenario.description
        );
        println!("{}", "-".repeat(70));
        println!("FUZZY CONTROLLER:");
        print_report(&result.fuzzy);
        println!("FIXED-TIME CONTROLLER:");
        print_report(&result.fixed);
        println!("IMPROVEMENT (fuzzy vs fixed):");
        println!("  Waiting Time:    {:+.1}%", result.comparison.waiting_time);
        println!("  Queue Length:    {:+.1}%", result.comparison.queue_length);
        println!("  Throughput:      {:+.1}%", result.comparison.throughput);
        println!("  Delay Reduction: {:+.1}%", result.comparison.delay);
        println!("  Fairness:        {:+.3}", result.comparison.fairness);
    }

    if let Some(path) = output {
        comparison::export_json(&results, &path)?;
        println!("Results exported to {}", path.display());
    }
    Ok(())
}

fn list_scenarios() {
    for scenario in simulation::catalog() {
        println!("{:<18} {}", scenario.key(), scenario.name());
        println!("{:<18} {}", "", scenario.description());
        let rates: Vec<String> = scenario
            .arrival_rates()
            .iter()
            .map(|(direction, rate)| format!("{}={}", direction.name(), rate))
            .collect();
        println!(
            "{:<18} {} veh/min, {:.0}s",
            "",
            rates.join(" "),
            scenario.duration()
        );
    }
}

fn decide(config: &SimulationConfig, queues: &[usize], waits: &[f64]) -> Result<()> {
    let policy = FuzzyDecisionPolicy::new().context("Failed to build the fuzzy controller")?;
    let snapshot = TrafficSnapshot::from_queues(
        0.0,
        PerDirection::from_fn(|direction| queues.get(direction.index()).copied().unwrap_or(0)),
        PerDirection::from_fn(|direction| waits.get(direction.index()).copied().unwrap_or(0.0)),
        config.density_per_vehicle,
    );

    for direction in Direction::ALL {
        let inputs = FuzzyDecisionPolicy::inputs_for(direction, &snapshot);
        println!(
            "{:<5} density={:>5.1} wait={:>5.1}s -> {:.1}s",
            direction.name(),
            inputs.current_density,
            inputs.current_waiting,
            policy.decide_for(direction, &inputs)
        );
    }
    for axis in [simulation::Axis::NorthSouth, simulation::Axis::EastWest] {
        println!("{} green: {:.1}s", axis.label(), policy.decide(axis, &snapshot));
    }
    Ok(())
}
