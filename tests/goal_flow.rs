use assert_cmd::prelude::*;
use std::process::Command;

fn moneyflow_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("moneyflow"))
}

fn run_ok(home: &tempfile::TempDir, args: &[&str]) {
    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(args);
    cmd.assert().success();
}

fn run_fail(home: &tempfile::TempDir, args: &[&str]) {
    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(args);
    cmd.assert().failure();
}

fn run_ok_out(home: &tempfile::TempDir, args: &[&str]) -> String {
    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(args);
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).expect("utf8 stdout")
}

#[test]
fn goal_create_deposit_and_list_shows_progress() {
    let home = tempfile::tempdir().expect("tempdir");

    run_ok(&home, &["goal", "create", "New Car", "5000"]);
    run_ok(&home, &["goal", "deposit", "New Car", "2000"]);

    let out = run_ok_out(&home, &["goal", "list"]);
    assert!(out.contains("New Car\t2 000\t5 000\t40%"), "list output: {out}");
}

#[test]
fn goal_names_are_unique_and_deposits_positive() {
    let home = tempfile::tempdir().expect("tempdir");

    run_ok(&home, &["goal", "create", "Trip", "1000"]);
    run_fail(&home, &["goal", "create", "Trip", "300"]);
    run_fail(&home, &["goal", "create", "Empty", "0"]);
    run_fail(&home, &["goal", "deposit", "Trip", "0"]);
    run_fail(&home, &["goal", "deposit", "Nowhere", "10"]);

    let out = run_ok_out(&home, &["goal", "list"]);
    assert_eq!(out.matches("Trip").count(), 1, "list output: {out}");
    assert!(!out.contains("Empty"), "list output: {out}");
}

#[test]
fn goal_update_renames_and_keeps_balance() {
    let home = tempfile::tempdir().expect("tempdir");

    run_ok(&home, &["goal", "create", "New Car", "5000"]);
    run_ok(&home, &["goal", "deposit", "New Car", "2000"]);
    run_ok(
        &home,
        &["goal", "update", "New Car", "--name", "Car", "--goal", "4000"],
    );

    let out = run_ok_out(&home, &["goal", "list"]);
    assert!(out.contains("Car\t2 000\t4 000\t50%"), "list output: {out}");
    assert!(!out.contains("New Car"), "list output: {out}");

    run_ok(&home, &["goal", "deposit", "Car", "3000"]);
    let out = run_ok_out(&home, &["goal", "list"]);
    assert!(out.contains("Car\t5 000\t4 000\t100%"), "list output: {out}");
}
