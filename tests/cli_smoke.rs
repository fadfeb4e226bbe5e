use assert_cmd::prelude::*;
use predicates::prelude::*;
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
fn help_lists_commands() {
    moneyflow_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dashboard"))
        .stdout(predicate::str::contains("goal"));
}

#[test]
fn config_is_created_on_first_run() {
    let home = tempfile::tempdir().expect("tempdir");

    let out = run_ok_out(&home, &["config"]);
    assert!(out.contains("remote_url\t<not set>"), "config output: {out}");
    assert!(out.contains("rate_eur\t0.0015"), "config output: {out}");
    let db_line = out
        .lines()
        .find(|l| l.starts_with("db\t"))
        .expect("db line");
    assert!(db_line.ends_with("moneyflow.sqlite3"), "config output: {out}");
    assert!(home.path().join("config").join("config.json").exists());
}

#[test]
fn empty_ledger_reports_placeholders() {
    let home = tempfile::tempdir().expect("tempdir");

    let out = run_ok_out(&home, &["tx", "list"]);
    assert!(out.contains("(no transactions)"), "list output: {out}");

    let out = run_ok_out(&home, &["series"]);
    assert!(out.contains("No data\t0 FCFA"), "series output: {out}");

    let out = run_ok_out(&home, &["categories"]);
    assert!(out.contains("No expenses"), "categories output: {out}");

    let out = run_ok_out(&home, &["budget", "show"]);
    assert!(out.contains("(no budget)"), "budget output: {out}");
}

#[test]
fn invalid_amounts_are_rejected_without_writing() {
    let home = tempfile::tempdir().expect("tempdir");

    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(["tx", "add", "expense", "abc"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid decimal for amount"));

    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(["tx", "add", "expense", "0"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Amount must be > 0"));

    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(["budget", "set", "weekly", "0"]);
    cmd.assert().failure();

    run_ok(&home, &["tx", "list"]);
    let out = run_ok_out(&home, &["tx", "list"]);
    assert!(out.contains("(no transactions)"), "list output: {out}");
}

#[test]
fn oversized_holdings_fail_cleanly() {
    let home = tempfile::tempdir().expect("tempdir");

    let mut cmd = moneyflow_cmd();
    cmd.env("MONEYFLOW_HOME", home.path());
    cmd.args(["crypto", "set", "BTC", "79228162514264337593543950335", "2"]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("too large to value"));

    let out = run_ok_out(&home, &["crypto", "list"]);
    assert!(out.contains("(no cryptos)"), "crypto output: {out}");
}
