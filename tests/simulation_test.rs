use std::process::{Command, Output};

fn fuzzy_signal(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fuzzy_signal"))
        .args(args)
        .env("RUST_LOG", "warn,fuzzy_signal=info")
        .output()
        .expect("Failed to execute fuzzy_signal")
}

/// Test that a single headless run completes and logs its summary
#[test]
fn test_run_completes() {
    let output = fuzzy_signal(&["run", "--scenario", "light", "--duration", "300"]);

    assert!(
        output.status.success(),
        "Run failed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Final State ==="), "Missing final state");
    assert!(stdout.contains("Avg Waiting Time:"), "Missing 'Avg Waiting Time'");
    assert!(stdout.contains("Throughput:"), "Missing 'Throughput'");
    assert!(stdout.contains("Fairness Index:"), "Missing 'Fairness Index'");
}

/// Test that the fixed-time policy can be selected and progress is printed
#[test]
fn test_fixed_run_with_progress() {
    let output = fuzzy_signal(&[
        "run",
        "--scenario",
        "rush_ns",
        "--policy",
        "fixed",
        "--duration",
        "200",
        "--progress",
        "100",
    ]);
    assert!(output.status.success(), "Run failed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("with the fixed policy"));
    assert!(stdout.contains("--- After 100s simulated time ---"));
    assert!(stdout.contains("--- After 200s simulated time ---"));
}

/// Test that the scenario list names every built-in scenario
#[test]
fn test_scenarios_listed() {
    let output = fuzzy_signal(&["scenarios"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for key in [
        "normal",
        "rush_ns",
        "rush_ew",
        "light",
        "asymmetric_north",
        "peak",
        "morning",
        "evening",
        "weekend",
    ] {
        assert!(stdout.contains(key), "Missing scenario '{}'", key);
    }
}

/// Test that a single decision is printed for both axes
#[test]
fn test_decide_prints_green_times() {
    let output = fuzzy_signal(&["decide", "--queues", "50", "50", "0", "0"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("N-S green:"), "Missing N-S decision");
    assert!(stdout.contains("E-W green:"), "Missing E-W decision");
    assert!(stdout.contains("density=100.0"));
}

/// Test that comparison results are exported as JSON
#[test]
fn test_compare_exports_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    let output = fuzzy_signal(&[
        "compare",
        "--scenario",
        "light",
        "--scenario",
        "peak",
        "--duration",
        "300",
        "--output",
        path.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "Compare failed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FUZZY CONTROLLER:"));
    assert!(stdout.contains("FIXED-TIME CONTROLLER:"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(json["light"]["comparison"].is_object());
    assert!(json["peak"]["comparison"].is_object());
}

/// Test that bad input fails with a message instead of a panic
#[test]
fn test_invalid_input_rejected() {
    let output = fuzzy_signal(&["run", "--scenario", "gridlock"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);

    let output = fuzzy_signal(&["run", "--delta", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Time step"), "stderr: {}", stderr);
}
