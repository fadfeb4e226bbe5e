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

fn run_ok_out(home: &tempfile::TempDir, args: &[&str]) -> String {
    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(args);
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).expect("utf8 stdout")
}

#[test]
fn weekly_budget_overspend_clamps_remaining() {
    let home = tempfile::tempdir().expect("tempdir");

    run_ok(&home, &["budget", "set", "weekly", "100"]);
    // No --date: both land on today, inside the trailing week.
    run_ok(&home, &["tx", "add", "expense", "40"]);
    run_ok(&home, &["tx", "add", "expense", "70"]);
    run_ok(&home, &["tx", "add", "income", "5000"]);

    let out = run_ok_out(&home, &["budget", "show"]);
    assert!(out.contains("period\tweekly"), "budget output: {out}");
    assert!(out.contains("spent\t110 FCFA"), "budget output: {out}");
    assert!(out.contains("remaining\t0 FCFA"), "budget output: {out}");
    assert!(out.contains("(over budget)"), "budget output: {out}");
}

#[test]
fn budget_ignores_filters_and_old_expenses() {
    let home = tempfile::tempdir().expect("tempdir");

    run_ok(&home, &["budget", "set", "monthly", "1000"]);
    run_ok(&home, &["tx", "add", "expense", "300"]);
    run_ok(&home, &["tx", "add", "expense", "999", "--date", "2001-01-15"]);

    let out = run_ok_out(&home, &["budget", "show"]);
    assert!(out.contains("limit\t1 000 FCFA"), "budget output: {out}");
    assert!(out.contains("spent\t300 FCFA"), "budget output: {out}");
    assert!(out.contains("remaining\t700 FCFA"), "budget output: {out}");
    assert!(!out.contains("(over budget)"), "budget output: {out}");
}
