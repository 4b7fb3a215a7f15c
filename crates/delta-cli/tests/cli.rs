//! Integration tests driving the `delta` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn delta(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_delta"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run delta")
}

/// A 2-input, 2-output network and an experiment over it.
fn write_experiment(dir: &Path, base_input: &str, extra: &str) -> PathBuf {
    std::fs::write(
        dir.join("net.json"),
        r#"{"name": "tiny", "model_path": "model.sh", "input_vars": [0, 1], "output_vars": [2, 3]}"#,
    )
    .unwrap();
    let config = format!(
        r#"{{
            "experiment_id": "exp-1",
            "output_dir": "out",
            "network": "net.json",
            "base_input": {base_input},
            "deltas": [0.01, 0.4, 0.7],
            "large": 100.0,
            "pairs": [[0, 1]]{extra}
        }}"#
    );
    let path = dir.join("experiment.json");
    std::fs::write(&path, config).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_validate_builds_every_query() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_experiment(dir.path(), "[0.5, 0.5]", "");
    let output = delta(&["validate", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output).trim(),
        "OK: 3 queries for 'tiny' (2 inputs, 2 outputs, 1 assertions each, 0 warnings)"
    );
}

#[test]
fn test_verbose_flag_enables_info_logs() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_experiment(dir.path(), "[0.5, 0.5]", "");
    let quiet = delta(&["validate", "--config", config.to_str().unwrap()]);
    assert!(quiet.status.success(), "{}", stderr(&quiet));
    assert!(!stderr(&quiet).contains("Validating experiment"));

    let verbose = delta(&["-v", "validate", "--config", config.to_str().unwrap()]);
    assert!(verbose.status.success(), "{}", stderr(&verbose));
    assert!(
        stderr(&verbose).contains("Validating experiment 'exp-1' on 'tiny'"),
        "{}",
        stderr(&verbose)
    );
}

#[test]
fn test_validate_reports_dimension_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_experiment(dir.path(), "[0.5, 0.5, 0.5]", "");
    let output = delta(&["validate", "--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("dimension mismatch: expected 2 values, got 3"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn test_validate_reads_base_input_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("image.json"), "[0.1, 0.9]").unwrap();
    let config = write_experiment(dir.path(), "\"image.json\"", r#", "parallel": true"#);
    let output = delta(&["validate", "-c", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
}

#[test]
fn test_render_prints_vnnlib() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_experiment(dir.path(), "[0.5, 0.5]", "");
    let output = delta(&[
        "render",
        "--config",
        config.to_str().unwrap(),
        "--delta",
        "0.25",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("; Network: tiny"));
    assert!(text.contains("(declare-const X_1 Real)"));
    assert!(text.contains("(assert (>= X_0 0.25))"));
    assert!(text.contains("(assert (<= X_0 0.75))"));
    assert!(text.contains("(assert (<= (+ Y_0 (* (- 1.0) Y_1)) 0.0))"));
}

#[test]
fn test_render_rejects_negative_delta() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_experiment(dir.path(), "[0.5, 0.5]", "");
    let output = delta(&[
        "render",
        "--config",
        config.to_str().unwrap(),
        "--delta=-0.1",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("delta"), "{}", stderr(&output));
}

#[test]
fn test_sweep_without_solver_binary_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_experiment(
        dir.path(),
        "[0.5, 0.5]",
        r#", "solver": {"binary": "/nonexistent/Marabou"}"#,
    );
    let output = delta(&["sweep", "--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("solver unavailable"), "{}", stderr(&output));
}

// `sh` runs the network's model path as a script standing in for the
// solver: UNSAT for the smallest delta, SAT for the rest.
#[cfg(unix)]
#[test]
fn test_sweep_logs_every_delta() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("model.sh"),
        r#"
summary=""
for a in "$@"; do
  case "$a" in --summary-file=*) summary="${a#--summary-file=}" ;; esac
done
if grep -q "; delta: 0.01" "$1"; then
  echo "unsat 0" > "$summary"
else
  echo "sat 0" > "$summary"
  echo "x0 = 0.5"
  echo "x1 = 0.5"
  echo "y0 = 1"
  echo "y1 = 2"
fi
"#,
    )
    .unwrap();
    let config = write_experiment(
        dir.path(),
        "[0.5, 0.5]",
        r#", "solver": {"binary": "sh"}"#,
    );

    let output = delta(&["sweep", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("3 deltas: 1 UNSAT, 2 SAT, 0 ERROR"), "{out}");
    assert!(out.contains("Largest robust delta: 0.01"), "{out}");

    let run_dir = dir.path().join("out/exp-1");
    let results = std::fs::read_to_string(run_dir.join("results.txt")).unwrap();
    let headers: Vec<&str> = results
        .lines()
        .filter(|l| l.starts_with("delta="))
        .collect();
    assert_eq!(
        headers,
        vec![
            "delta=0.01 pairs=[y0<=y1] result=UNSAT",
            "delta=0.4 pairs=[y0<=y1] result=SAT",
            "delta=0.7 pairs=[y0<=y1] result=SAT",
        ]
    );
    assert!(results.contains("  y1 = 2\n"));
    let timing = std::fs::read_to_string(run_dir.join("timing.txt")).unwrap();
    assert_eq!(timing.lines().count(), 3);
    assert!(run_dir.join("solver.log").exists());
}
