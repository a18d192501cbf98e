// End-to-end runs of the metronome binary

use std::path::Path;
use std::process::{Command, Output};

fn metronome(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_metronome"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_warn_prints_flattened_lines() {
    let dir = tempfile::tempdir().unwrap();
    let output = metronome(&dir.path().join("config.toml"), &["warn", "a", "[b,[c]]", "3", "0.5"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stderr).unwrap(), "a\nb\nc\n3\n0.5\n");
}

#[test]
fn test_warn_respects_configured_depth() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[diagnostics]\nmax_depth = 1\n").unwrap();

    let output = metronome(&config, &["warn", "top", "[[deep]]"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stderr).unwrap(), "top\n");
}

#[test]
fn test_alarm_replacement_reports_previous() {
    let dir = tempfile::tempdir().unwrap();
    let output = metronome(&dir.path().join("config.toml"), &["alarm", "5", "2"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "alarm(5) -> 0\nalarm(2) -> 5\n");
}

#[test]
fn test_negative_alarm_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = metronome(&dir.path().join("config.toml"), &["alarm", "--", "-1"]);

    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_sleep_interrupted_by_alarm() {
    let dir = tempfile::tempdir().unwrap();
    let output = metronome(&dir.path().join("config.toml"), &["sleep", "3", "--alarm", "1"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("interrupted by 1 signal(s)"), "{out}");
    assert!(out.trim_end().ends_with("s left"), "{out}");
}

#[test]
fn test_tick_runs_count_steps() {
    let dir = tempfile::tempdir().unwrap();
    let output = metronome(
        &dir.path().join("config.toml"),
        &["tick", "--step", "0.02", "--count", "3"],
    );

    assert!(output.status.success());
    let out = stdout(&output);
    let ticks = out.lines().filter(|line| line.starts_with("tick ")).count();
    assert_eq!(ticks, 3, "{out}");
    assert!(out.lines().last().unwrap().starts_with("3 steps"), "{out}");
}

#[test]
fn test_malformed_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[timing\n").unwrap();

    let output = metronome(&config, &["warn", "x"]);
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr).unwrap().contains("failed to load config"));
}

#[test]
fn test_count_runs_states_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let output = metronome(
        &dir.path().join("config.toml"),
        &["count", "--step", "0.02", "--to", "3"],
    );

    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "count 1\ncount 2\ncount 3\ncounted to 3\n4 steps, ended in done\n"
    );
}
