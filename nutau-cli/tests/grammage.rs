#![allow(missing_docs)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[test]
fn grammage_scan_writes_one_line_per_primary_and_needs_no_pdf() {
    let dir = assert_fs::TempDir::new().unwrap();
    let output = dir.path().join("out.txt");

    Command::cargo_bin("nutau")
        .unwrap()
        .current_dir(&dir)
        .args([
            "16",
            "--grammage",
            "--taus",
            "5",
            "--cos-theta-min",
            "0.1",
            "--cos-theta-max",
            "0.9",
            "--output-file",
        ])
        .arg(&output)
        .assert()
        .success();

    let text = fs::read_to_string(&output).unwrap();
    let data_lines: Vec<_> = text.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(data_lines.len(), 5);
    for line in data_lines {
        let cols: Vec<_> = line.split_whitespace().collect();
        assert_eq!(cols.len(), 2);
        assert!(cols[1].parse::<f64>().unwrap() >= 0.0);
    }
}

#[test]
fn append_mode_does_not_rewrite_the_header() {
    let dir = assert_fs::TempDir::new().unwrap();
    let output = dir.path().join("out.txt");

    let run = |append: bool| {
        let mut cmd = Command::cargo_bin("nutau").unwrap();
        cmd.current_dir(&dir).args(["16", "--grammage", "--taus", "1"]);
        if append {
            cmd.arg("--append");
        }
        cmd.arg("--output-file").arg(&output).assert().success();
    };
    run(false);
    run(true);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with('#')).count(), 1);
    assert_eq!(text.lines().filter(|l| !l.starts_with('#')).count(), 2);
}

#[test]
fn fixed_cos_theta_pins_every_sampled_angle() {
    let dir = assert_fs::TempDir::new().unwrap();
    let output = dir.path().join("out.txt");

    Command::cargo_bin("nutau")
        .unwrap()
        .current_dir(&dir)
        .args(["-16", "--grammage", "--taus", "3", "--cos-theta", "0.5"])
        .arg("--output-file")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(&output).unwrap();
    for line in text.lines().filter(|l| !l.starts_with('#')) {
        let angle: f64 = line.split_whitespace().next().unwrap().parse().unwrap();
        assert!((angle - 0.5).abs() < 1.0e-9);
    }
}
