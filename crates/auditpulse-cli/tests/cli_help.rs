use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    cargo_bin_cmd!("auditpulse")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("audits"))
        .stdout(predicate::str::contains("subscription"))
        .stdout(predicate::str::contains("locale"));
}

#[test]
fn test_audits_help_shows_subcommands() {
    cargo_bin_cmd!("auditpulse")
        .args(["audits", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("download"));
}

#[test]
fn test_unknown_plan_is_rejected() {
    cargo_bin_cmd!("auditpulse")
        .args(["subscription", "checkout", "enterprise"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown plan"));
}
