//! The hidden `check run` worker entrypoint and full parent/worker round trips.
//!
//! Round trips use a pass-through namespace helper (`exec "$@"`), so the real binary
//! re-enters itself as the worker without any user namespace.

use assert_cmd::Command;
use imagecert_test_util::bucket_names;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(deprecated)]
fn imagecert_cmd() -> Command {
    let mut cmd = Command::cargo_bin("imagecert").expect("imagecert binary");
    cmd.env_remove("IMAGECERT_IN_SANDBOX")
        .env_remove("IMAGECERT_LOG_LEVEL");
    cmd
}

fn rootfs(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures/rootfs")
        .join(name)
}

#[test]
fn worker_without_sandbox_marker_reports_fatal() {
    let temp_dir = TempDir::new().expect("temp dir");
    imagecert_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "run"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::starts_with("level=fatal msg=\""))
        .stderr(predicate::str::contains("IMAGECERT_IN_SANDBOX"));
}

#[test]
fn worker_runs_the_requested_check_and_prints_results() {
    let temp_dir = TempDir::new().expect("temp dir");
    let log_file = temp_dir.path().join("logs/sandbox.log");

    let output = imagecert_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "run"])
        .env("IMAGECERT_IN_SANDBOX", "1")
        .env("IMAGECERT_CHECK_NAME", "HasOsRelease")
        .env("IMAGECERT_IMAGE", rootfs("compliant"))
        .env("IMAGECERT_MOUNTED", "true")
        .env("IMAGECERT_LOG_FILE", &log_file)
        .env("IMAGECERT_LOG_LEVEL", "debug")
        .output()
        .expect("run worker");

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty(), "{}", String::from_utf8_lossy(&output.stderr));
    let results: Value = serde_json::from_slice(&output.stdout).expect("results on stdout");
    assert_eq!(bucket_names(&results, "passed"), vec!["HasOsRelease"]);
    assert_eq!(results["passed_overall"], true);

    let log = std::fs::read_to_string(&log_file).expect("worker log");
    assert!(log.contains("worker started"), "{log}");
}

#[test]
fn worker_ignores_config_file_in_its_working_directory() {
    let temp_dir = TempDir::new().expect("temp dir");
    std::fs::write(temp_dir.path().join("imagecert.toml"), "this is = = not toml")
        .expect("write config");

    let output = imagecert_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "run"])
        .env("IMAGECERT_IN_SANDBOX", "1")
        .env("IMAGECERT_CHECK_NAME", "HasOsRelease")
        .env("IMAGECERT_IMAGE", rootfs("compliant"))
        .env("IMAGECERT_MOUNTED", "true")
        .output()
        .expect("run worker");

    assert_eq!(
        output.status.code(),
        Some(0),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let results: Value = serde_json::from_slice(&output.stdout).expect("results on stdout");
    assert_eq!(bucket_names(&results, "passed"), vec!["HasOsRelease"]);
}

#[test]
fn worker_with_unknown_check_reports_fatal() {
    let temp_dir = TempDir::new().expect("temp dir");
    imagecert_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "run"])
        .env("IMAGECERT_IN_SANDBOX", "1")
        .env("IMAGECERT_CHECK_NAME", "HasTypo")
        .env("IMAGECERT_IMAGE", "quay.io/example/app:1.0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("level=fatal"))
        .stderr(predicate::str::contains("check not found: HasTypo"));
}

#[cfg(unix)]
mod round_trip {
    use super::*;
    use imagecert_test_util::write_stub;

    #[test]
    fn sandboxed_checks_run_in_a_reentered_worker() {
        let temp_dir = TempDir::new().expect("temp dir");
        let helper = write_stub(temp_dir.path(), "passthrough", "exec \"$@\"");
        let results_path = temp_dir.path().join("results.json");

        imagecert_cmd()
            .current_dir(temp_dir.path())
            .args(["--log-level", "debug", "--namespace-helper"])
            .arg(&helper)
            .args(["check", "container", "--mounted", "--sandbox-all-checks"])
            .args(["--skip", "ReferenceIsPinned", "--results-out"])
            .arg(&results_path)
            .arg(rootfs("compliant"))
            .assert()
            .success();

        let results: Value =
            serde_json::from_str(&std::fs::read_to_string(&results_path).expect("results"))
                .expect("json");
        assert_eq!(
            bucket_names(&results, "passed"),
            vec!["HasLicense", "HasOsRelease"]
        );

        let log = std::fs::read_to_string(temp_dir.path().join("artifacts/imagecert-sandbox.log"))
            .expect("sandbox log");
        assert_eq!(log.matches("worker started").count(), 2, "{log}");
    }

    #[test]
    fn fatal_worker_is_recorded_as_an_error() {
        let temp_dir = TempDir::new().expect("temp dir");
        let helper = write_stub(
            temp_dir.path(),
            "broken-unshare",
            "echo 'Level=Fatal msg=\"cannot set up namespace\"' >&2\nexit 1",
        );

        let output = imagecert_cmd()
            .current_dir(temp_dir.path())
            .arg("--namespace-helper")
            .arg(&helper)
            .args(["check", "container", "--mounted", "--sandbox-all-checks"])
            .args(["--skip", "ReferenceIsPinned"])
            .arg(rootfs("compliant"))
            .output()
            .expect("run");

        assert_eq!(output.status.code(), Some(2));
        let results: Value = serde_json::from_str(
            &std::fs::read_to_string(temp_dir.path().join("artifacts/results.json"))
                .expect("results"),
        )
        .expect("json");
        assert_eq!(
            bucket_names(&results, "errors"),
            vec!["HasLicense", "HasOsRelease"]
        );
        let error = results["errors"][0]["error"].as_str().unwrap_or_default();
        assert!(error.contains("cannot set up namespace"), "{error}");
    }
}
