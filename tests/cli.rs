//! CLI end-to-end tests driving the real binary against temp databases.

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn ingest_then_list_round_trip() {
    let dir = tempdir().expect("temp dir");
    let csv = dir.path().join("loans.csv");
    fs::write(
        &csv,
        "loaner_id,fullname,mobile_no,amount\n\
1,Asha Devi,9876543210,5000\n\
2,Ravi Kumar,8765432109,7500\n",
    )
    .expect("write csv");
    let db = dir.path().join("ledger.db");

    Command::cargo_bin("loan-intake")
        .expect("binary exists")
        .args([
            "ingest",
            "-i",
            csv.to_str().unwrap(),
            "-d",
            db.to_str().unwrap(),
            "--json",
        ])
        .assert()
        .success()
        .stdout(contains("\"rows_inserted\": 2"))
        .stdout(contains("\"mapping_source\": \"direct_header\""));

    Command::cargo_bin("loan-intake")
        .expect("binary exists")
        .args(["list", "-d", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Asha Devi"))
        .stdout(contains("Ravi Kumar"));
}

#[test]
fn reingest_reports_duplicates_in_summary_output() {
    let dir = tempdir().expect("temp dir");
    let csv = dir.path().join("loans.csv");
    fs::write(
        &csv,
        "loaner_id,fullname,mobile_no,amount\n1,Asha Devi,9876543210,5000\n",
    )
    .expect("write csv");
    let db = dir.path().join("ledger.db");

    let run = || {
        let mut cmd = Command::cargo_bin("loan-intake").expect("binary exists");
        cmd.args([
            "ingest",
            "-i",
            csv.to_str().unwrap(),
            "-d",
            db.to_str().unwrap(),
        ]);
        cmd
    };

    run().assert().success();
    run()
        .assert()
        .success()
        .stdout(contains("0 row(s) inserted, 1 duplicate(s) skipped"));
}

#[test]
fn empty_file_fails_with_a_clear_message() {
    let dir = tempdir().expect("temp dir");
    let empty = dir.path().join("empty.xlsx");
    fs::write(&empty, "").expect("write empty file");
    let db = dir.path().join("ledger.db");

    Command::cargo_bin("loan-intake")
        .expect("binary exists")
        .args([
            "ingest",
            "-i",
            empty.to_str().unwrap(),
            "-d",
            db.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("empty"));
}

#[test]
fn list_on_a_fresh_database_prints_only_headers() {
    let dir = tempdir().expect("temp dir");
    let db = dir.path().join("ledger.db");

    Command::cargo_bin("loan-intake")
        .expect("binary exists")
        .args(["list", "-d", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("identifier"));
}
