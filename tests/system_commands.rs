mod common;

use assert_cmd::Command;
use common::WizardHarness;
use predicates::prelude::*;
use regex::Regex;

#[test]
fn help_groups_commands_and_marks_wizard_ones() {
    let harness = WizardHarness::new();
    Command::cargo_bin("budget_wizard_cli")
        .expect("binary exists")
        .env("BUDGET_WIZARD_HOME", harness.home())
        .env("BUDGET_WIZARD_CLI_SCRIPT", "1")
        .env("NO_COLOR", "1")
        .write_stdin("help\nhelp set\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Available commands ==="))
        .stdout(predicate::str::contains("Wizard:"))
        .stdout(predicate::str::contains("Usage: set <row> [value]"))
        .stdout(predicate::str::contains("Requires a loaded catalog."));
}

#[test]
fn status_reports_session_and_storage() {
    let harness = WizardHarness::new();
    let output = harness.run_script("status\nexit\n");

    let session =
        Regex::new(r"Session\s+: [0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("valid regex");
    assert!(session.is_match(&output.stdout), "{}", output.stdout);
    assert!(output.stdout.contains("Step      : 1 of 10 (Income / Salary)"));
    assert!(output.stdout.contains("Saved     : 0 of 10 steps"));
    assert!(output.stdout.contains("Catalog   : built-in demo catalog (3 categories, 10 steps"));
}

#[test]
fn session_id_is_kept_across_runs() {
    let harness = WizardHarness::new();
    let pattern = Regex::new(r"Session\s+: (\S+)").expect("valid regex");
    let first = harness.run_script("status\nexit\n");
    let second = harness.run_script("status\nexit\n");

    let id = |stdout: &str| {
        pattern
            .captures(stdout)
            .map(|caps| caps[1].to_string())
            .expect("session line")
    };
    assert_eq!(id(&first.stdout), id(&second.stdout));
}

#[test]
fn config_changes_are_persisted() {
    let harness = WizardHarness::new();
    let output = harness.run_script("config currency_symbol €\nshow\nexit\n");
    assert!(output.stdout.contains("Subtotal: €0.00"));

    let output = harness.run_script("config currency_symbol\nexit\n");
    assert!(output.stdout.contains("€"));
}
