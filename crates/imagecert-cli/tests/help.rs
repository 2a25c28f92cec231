use assert_cmd::Command;
use predicates::prelude::*;

/// Helper to get a Command for the imagecert binary.
#[allow(deprecated)]
fn imagecert_cmd() -> Command {
    Command::cargo_bin("imagecert").unwrap()
}

#[test]
fn help_works() {
    imagecert_cmd().arg("--help").assert().success();
}

#[test]
fn check_help_lists_policies_but_not_the_worker() {
    imagecert_cmd()
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("container"))
        .stdout(predicate::str::contains("operator"))
        .stdout(predicate::str::contains("Sandbox worker").not());
}

#[test]
fn policy_requires_an_image() {
    imagecert_cmd()
        .args(["check", "container"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<IMAGE>"));
}

#[test]
fn list_shows_every_check_with_its_policies() {
    imagecert_cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("HasLicense"))
        .stdout(predicate::str::contains("BundleHasAnnotations"))
        .stdout(predicate::str::contains("[container,operator]"));
}

#[test]
fn explain_prints_remediation() {
    imagecert_cmd()
        .args(["explain", "haslicense"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("HasLicense\n"))
        .stdout(predicate::str::contains("Remediation"));
}

#[test]
fn explain_unknown_check_fails_with_suggestions() {
    imagecert_cmd()
        .args(["explain", "HasTypo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown check: HasTypo"))
        .stderr(predicate::str::contains("  - HasOsRelease"));
}
