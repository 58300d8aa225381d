//! Command line tests for the admark binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary isolated from user configuration
fn admark(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("admark").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("ADMARK_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn recording(dir: &Path, marks: &str) {
    fs::write(
        dir.join("recording.toml"),
        "[recording]\nfps = 25.0\nlength_secs = 600\npre_timer_secs = 60\nchannel = \"Test\"\n",
    )
    .unwrap();
    fs::write(dir.join("marks"), marks).unwrap();
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    admark(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mark"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("verify"));
}

#[test]
fn test_astopoffs_out_of_range() {
    let home = TempDir::new().unwrap();
    admark(home.path())
        .args(["mark", "rec", "--astopoffs", "300"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("astopoffs"));
}

#[test]
fn test_inspect_lists_marks() {
    let home = TempDir::new().unwrap();
    let rec = home.path().join("rec");
    fs::create_dir(&rec).unwrap();
    recording(&rec, "0:01:00.00 (1500) LOGOSTART\n0:11:00.00 (16500) LOGOSTOP\n");

    admark(home.path())
        .args(["inspect"])
        .arg(&rec)
        .assert()
        .success()
        .stdout(predicate::str::contains("Channel: Test"))
        .stdout(predicate::str::contains("(  16500) LOGOSTOP"));

    admark(home.path())
        .args(["inspect", "--json"])
        .arg(&rec)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mark_type\": \"LOGOSTART\""));
}

#[test]
fn test_verify_rejects_consecutive_starts() {
    let home = TempDir::new().unwrap();
    let rec = home.path().join("rec");
    fs::create_dir(&rec).unwrap();
    recording(
        &rec,
        "0:01:00.00 (1500) LOGOSTART\n0:02:00.00 (3000) LOGOSTART\n0:11:00.00 (16500) LOGOSTOP\n",
    );

    admark(home.path())
        .arg("verify")
        .arg(&rec)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not usable"));
}

#[test]
fn test_mark_writes_marks_file() {
    let home = TempDir::new().unwrap();
    let rec = home.path().join("rec");
    fs::create_dir(&rec).unwrap();
    recording(&rec, "");
    let frames: Vec<String> = (25..=31600)
        .step_by(25)
        .map(|frame| format!("{{\"frame\": {}, \"key_frame\": true}}", frame))
        .collect();
    fs::write(rec.join("frames.json"), format!("[{}]", frames.join(","))).unwrap();

    admark(home.path())
        .args(["mark", "--detect-only"])
        .arg(&rec)
        .assert()
        .success()
        .stdout(predicate::str::contains("ASSUMEDSTART"));

    let marks = fs::read_to_string(rec.join("marks")).unwrap();
    assert!(marks.contains("(1500) ASSUMEDSTART"));
}
