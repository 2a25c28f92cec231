//! End-to-end policy runs through the application layer.
//!
//! Local (`mounted`) runs need no external tools. Image runs use stub scripts for the
//! container engine and for the namespace helper, which plays the worker's part.

use camino::{Utf8Path, Utf8PathBuf};
use imagecert_app::{CheckInput, WorkerInput, results_exit_code, run_check, run_worker};
use imagecert_sandbox::WorkerRequest;
use imagecert_settings::Overrides;
use imagecert_types::ids;
use tempfile::TempDir;

struct Workspace {
    _tmp: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        Self { _tmp: tmp, root }
    }

    fn file(&self, rel: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, contents).expect("write");
        path
    }

    /// A container root filesystem that satisfies every filesystem check.
    fn compliant_rootfs(&self) -> Utf8PathBuf {
        self.file("rootfs/licenses/LICENSE", "Apache-2.0\n");
        self.file("rootfs/etc/os-release", "ID=ubi\n");
        self.root.join("rootfs")
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            artifacts_dir: Some(self.root.join("artifacts")),
            ..Overrides::default()
        }
    }
}

fn input<'a>(policy: &'a str, image: &'a str, mounted: bool, overrides: Overrides) -> CheckInput<'a> {
    CheckInput {
        policy,
        image,
        mounted,
        config_text: "",
        overrides,
        self_exe: "/opt/imagecert/bin/imagecert".into(),
    }
}

fn names(list: &[imagecert_types::CheckResult]) -> Vec<&str> {
    list.iter().map(|r| r.name.as_str()).collect()
}

#[test]
fn mounted_rootfs_runs_filesystem_and_mount_checks_in_process() {
    let ws = Workspace::new();
    let rootfs = ws.compliant_rootfs();

    let output = run_check(input(
        ids::POLICY_CONTAINER,
        rootfs.as_str(),
        true,
        ws.overrides(),
    ))
    .expect("run");
    let results = output.results;

    assert_eq!(
        names(&results.passed),
        vec![ids::CHECK_HAS_LICENSE, ids::CHECK_HAS_OS_RELEASE]
    );
    assert_eq!(names(&results.errors), vec![ids::CHECK_REFERENCE_IS_PINNED]);
    assert!(!results.passed_overall);
    assert_eq!(results_exit_code(&results), 2);
    assert_eq!(results.tested_image, rootfs.as_str());
}

#[test]
fn skipped_checks_do_not_count() {
    let ws = Workspace::new();
    let rootfs = ws.compliant_rootfs();
    let mut overrides = ws.overrides();
    overrides.skip_checks = vec![ids::CHECK_REFERENCE_IS_PINNED.to_string()];

    let results = run_check(input(ids::POLICY_CONTAINER, rootfs.as_str(), true, overrides))
        .expect("run")
        .results;

    assert_eq!(results.len(), 2);
    assert!(results.passed_overall);
    assert_eq!(results_exit_code(&results), 0);
}

#[test]
fn skipping_everything_is_an_error() {
    let ws = Workspace::new();
    let rootfs = ws.compliant_rootfs();
    let mut overrides = ws.overrides();
    overrides.skip_checks = vec![
        ids::CHECK_REFERENCE_IS_PINNED.to_string(),
        ids::CHECK_BUNDLE_HAS_MANIFESTS.to_string(),
        ids::CHECK_BUNDLE_HAS_ANNOTATIONS.to_string(),
    ];

    let err = run_check(input(ids::POLICY_OPERATOR, rootfs.as_str(), true, overrides))
        .unwrap_err();
    assert!(format!("{err:#}").contains("no checks enabled"), "{err:#}");
}

#[test]
fn missing_mounted_root_is_a_runtime_error() {
    let ws = Workspace::new();
    let missing = ws.root.join("nope");
    let err = run_check(input(
        ids::POLICY_CONTAINER,
        missing.as_str(),
        true,
        ws.overrides(),
    ))
    .unwrap_err();
    assert!(format!("{err:#}").contains("target directory does not exist"), "{err:#}");
}

#[test]
fn invalid_config_is_reported_with_context() {
    let ws = Workspace::new();
    let rootfs = ws.compliant_rootfs();
    let mut check = input(ids::POLICY_CONTAINER, rootfs.as_str(), true, ws.overrides());
    check.config_text = "container_engine = [";
    let err = run_check(check).unwrap_err();
    assert!(format!("{err:#}").starts_with("parse config"), "{err:#}");
}

#[test]
fn worker_runs_only_the_requested_check() {
    let ws = Workspace::new();
    let rootfs = ws.compliant_rootfs();

    let results = run_worker(WorkerInput {
        request: WorkerRequest {
            check_name: ids::CHECK_HAS_OS_RELEASE.to_string(),
            image: rootfs.to_string(),
            mounted: true,
        },
        config_text: "",
        overrides: Overrides::default(),
    })
    .expect("worker");

    assert_eq!(results.len(), 1);
    assert_eq!(names(&results.passed), vec![ids::CHECK_HAS_OS_RELEASE]);
    assert!(results.passed_overall);
}

#[test]
fn worker_rejects_unknown_check() {
    let err = run_worker(WorkerInput {
        request: WorkerRequest {
            check_name: "HasTypo".to_string(),
            image: "quay.io/a/b:1".to_string(),
            mounted: false,
        },
        config_text: "",
        overrides: Overrides::default(),
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("check not found: HasTypo"), "{err:#}");
}

#[cfg(unix)]
mod with_stubs {
    use super::*;
    use imagecert_test_util::{read_calls, recording_stub, results_json, write_stub};
    use std::fs::File;

    const IMAGE: &str = "quay.io/example/app:1.0";

    fn write_archive(path: &Utf8Path, files: &[(&str, &[u8])]) {
        let mut builder = tar::Builder::new(File::create(path).expect("create"));
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).expect("append");
        }
        builder.finish().expect("finish");
    }

    #[test]
    fn image_run_combines_extracted_and_sandboxed_checks() {
        let ws = Workspace::new();
        let stubs = ws.root.join("stubs");
        std::fs::create_dir_all(&stubs).expect("stubs");

        let archive = ws.root.join("saved.archive");
        write_archive(&archive, &[("licenses/LICENSE", b"MIT\n")]);
        let podman = recording_stub(
            stubs.as_std_path(),
            "podman",
            &format!(
                r#"case "$1" in
  pull) echo "0123abcd" ;;
  save) cp '{archive}' "$5" ;;
  *) exit 125 ;;
esac"#
            ),
        );

        let env_log = ws.root.join("worker-env.log");
        let worker_json = results_json(IMAGE, true, &[ids::CHECK_HAS_OS_RELEASE], &[], &[]);
        let helper = write_stub(
            stubs.as_std_path(),
            "unshare",
            &format!(
                "echo \"$IMAGECERT_CHECK_NAME|$IMAGECERT_IMAGE|${{IMAGECERT_MOUNTED:-}}|$IMAGECERT_LOG_FILE|$*\" >> '{env_log}'\ncat <<'JSON'\n{worker_json}\nJSON"
            ),
        );

        let overrides = Overrides {
            container_engine: Some(podman.to_string_lossy().into_owned()),
            namespace_helper: Some(vec![helper.to_string_lossy().into_owned()]),
            ..ws.overrides()
        };
        let output = run_check(input(ids::POLICY_CONTAINER, IMAGE, false, overrides)).expect("run");
        let results = output.results;

        assert_eq!(
            names(&results.passed),
            vec![
                ids::CHECK_HAS_LICENSE,
                ids::CHECK_HAS_OS_RELEASE,
                ids::CHECK_REFERENCE_IS_PINNED
            ]
        );
        assert!(results.passed_overall);

        let calls = read_calls(stubs.as_std_path());
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], format!("pull {IMAGE}"));
        assert!(calls[1].starts_with("save --format docker-archive -o "));

        let sandbox_log = output.resolved_config.sandbox_log;
        let env = std::fs::read_to_string(&env_log).expect("env log");
        assert_eq!(
            env.trim(),
            format!(
                "{}|{IMAGE}||{sandbox_log}|/opt/imagecert/bin/imagecert check run",
                ids::CHECK_HAS_OS_RELEASE
            )
        );
        assert!(
            sandbox_log.parent().is_some_and(|p| p.is_dir()),
            "the sandbox log directory exists before the worker starts"
        );
    }

    #[test]
    fn fatal_worker_lands_in_errors_and_the_run_continues() {
        let ws = Workspace::new();
        let stubs = ws.root.join("stubs");
        std::fs::create_dir_all(&stubs).expect("stubs");

        let podman = write_stub(stubs.as_std_path(), "podman", "echo 'denied' >&2\nexit 125");
        let helper = write_stub(
            stubs.as_std_path(),
            "unshare",
            "echo 'level=fatal msg=\"image mount failed\"' >&2\nexit 1",
        );
        let overrides = Overrides {
            container_engine: Some(podman.to_string_lossy().into_owned()),
            namespace_helper: Some(vec![helper.to_string_lossy().into_owned()]),
            ..ws.overrides()
        };

        let results = run_check(input(ids::POLICY_CONTAINER, IMAGE, false, overrides))
            .expect("run")
            .results;

        assert_eq!(
            names(&results.errors),
            vec![ids::CHECK_HAS_LICENSE, ids::CHECK_HAS_OS_RELEASE]
        );
        assert_eq!(names(&results.passed), vec![ids::CHECK_REFERENCE_IS_PINNED]);
        assert!(!results.passed_overall);
        let sandbox_error = results.errors[1].error.as_deref().unwrap_or_default();
        assert!(sandbox_error.contains("image mount failed"), "{sandbox_error}");
    }

    #[test]
    fn worker_mounts_the_image_and_unmounts_it() {
        let ws = Workspace::new();
        let rootfs = ws.compliant_rootfs();
        let stubs = ws.root.join("stubs");
        std::fs::create_dir_all(&stubs).expect("stubs");
        let podman = recording_stub(
            stubs.as_std_path(),
            "podman",
            &format!(
                r#"case "$2" in
  mount) echo '{rootfs}' ;;
esac"#
            ),
        );

        let results = run_worker(WorkerInput {
            request: WorkerRequest {
                check_name: ids::CHECK_HAS_OS_RELEASE.to_string(),
                image: IMAGE.to_string(),
                mounted: false,
            },
            config_text: &format!("container_engine = \"{}\"\n", podman.display()),
            overrides: Overrides::default(),
        })
        .expect("worker");

        assert_eq!(names(&results.passed), vec![ids::CHECK_HAS_OS_RELEASE]);
        assert_eq!(
            read_calls(stubs.as_std_path()),
            vec![format!("image mount {IMAGE}"), format!("image unmount {IMAGE}")]
        );
    }
}
