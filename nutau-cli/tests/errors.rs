#![allow(missing_docs)]

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn rejects_an_unknown_primary_pdg_code() {
    Command::cargo_bin("nutau")
        .unwrap()
        .args(["13", "--grammage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be one of -12, 16, -16"));
}

#[test]
fn requires_a_pdf_file_outside_grammage_mode() {
    let dir = assert_fs::TempDir::new().unwrap();
    Command::cargo_bin("nutau")
        .unwrap()
        .current_dir(&dir)
        .args(["16", "--taus", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf-file"));
}

#[test]
fn help_lists_the_forward_flags() {
    Command::cargo_bin("nutau")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--cos-theta"))
        .stdout(predicate::str::contains("--grammage"))
        .stdout(predicate::str::contains("--output-file"));
}
