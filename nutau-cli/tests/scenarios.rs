#![allow(missing_docs)]

use assert_cmd::Command;
use std::fs;

/// Scenario 1 (grammage, straight down): a single vertical event must
/// report cos_theta = 1 exactly and a positive chord grammage.
#[test]
fn grammage_straight_down_reports_unit_cos_theta_and_positive_grammage() {
    let dir = assert_fs::TempDir::new().unwrap();
    let output = dir.path().join("out.txt");

    Command::cargo_bin("nutau")
        .unwrap()
        .current_dir(&dir)
        .args(["16", "--grammage", "--taus", "1", "--cos-theta", "1.0"])
        .arg("--output-file")
        .arg(&output)
        .assert()
        .success();

    let text = fs::read_to_string(&output).unwrap();
    let data_lines: Vec<_> = text.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(data_lines.len(), 1);
    let cols: Vec<_> = data_lines[0].split_whitespace().collect();
    let cos_theta: f64 = cols[0].parse().unwrap();
    let grammage: f64 = cols[1].parse().unwrap();
    assert!((cos_theta - 1.0).abs() < 1.0e-9);
    assert!(grammage > 0.0);
}

/// Scenario 2 (grammage, horizontal grid): 11 events spanning
/// cos_theta in [0.15, 0.25] must land on the grid's arithmetic
/// progression (step 0.01), in ascending order.
#[test]
fn grammage_horizontal_grid_is_an_arithmetic_progression() {
    let dir = assert_fs::TempDir::new().unwrap();
    let output = dir.path().join("out.txt");

    Command::cargo_bin("nutau")
        .unwrap()
        .current_dir(&dir)
        .args(["16", "--grammage", "--taus", "11", "--cos-theta-min", "0.15", "--cos-theta-max", "0.25"])
        .arg("--output-file")
        .arg(&output)
        .assert()
        .success();

    let text = fs::read_to_string(&output).unwrap();
    let data_lines: Vec<_> = text.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(data_lines.len(), 11);
    for (i, line) in data_lines.iter().enumerate() {
        let cos_theta: f64 = line.split_whitespace().next().unwrap().parse().unwrap();
        let expected = 0.15 + (i as f64 / 10.0) * 0.10;
        assert!((cos_theta - expected).abs() < 1.0e-9, "line {i}: got {cos_theta}, expected {expected}");
    }
}

/// Scenario 5 (append safety): two back-to-back invocations with
/// `--append` must produce a file whose first invocation's records are
/// byte-identical to a standalone run of the same event.
#[test]
fn append_then_append_again_preserves_the_first_invocations_bytes() {
    let solo_dir = assert_fs::TempDir::new().unwrap();
    let solo_output = solo_dir.path().join("solo.txt");
    Command::cargo_bin("nutau")
        .unwrap()
        .current_dir(&solo_dir)
        .args(["16", "--grammage", "--taus", "3", "--cos-theta", "0.4"])
        .arg("--output-file")
        .arg(&solo_output)
        .assert()
        .success();
    let solo_text = fs::read_to_string(&solo_output).unwrap();

    let appended_dir = assert_fs::TempDir::new().unwrap();
    let appended_output = appended_dir.path().join("appended.txt");
    let run = |append: bool| {
        let mut cmd = Command::cargo_bin("nutau").unwrap();
        cmd.current_dir(&appended_dir).args(["16", "--grammage", "--taus", "3", "--cos-theta", "0.4"]);
        if append {
            cmd.arg("--append");
        }
        cmd.arg("--output-file").arg(&appended_output).assert().success();
    };
    run(false);
    run(true);

    let appended_text = fs::read_to_string(&appended_output).unwrap();
    assert!(appended_text.starts_with(&solo_text));
    let data_only: String = solo_text.lines().filter(|l| !l.starts_with('#')).map(|l| format!("{l}\n")).collect();
    assert_eq!(appended_text, format!("{solo_text}{data_only}"));
}
