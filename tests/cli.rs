//! End-to-end CLI coverage (SPEC_FULL.md §4.0f), exercised through the
//! compiled binary with `assert_cmd` so process-level concerns (exit
//! codes, stdout/stderr shape) are covered, not just library calls.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd(data_root: &std::path::Path, workspace_root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("redletters").unwrap();
    cmd.arg("--data-root").arg(data_root).arg("--workspace-root").arg(workspace_root);
    cmd
}

#[test]
fn source_status_lists_the_seeded_catalog() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["source", "status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sblgnt"))
        .stdout(predicate::str::contains("na28"));
}

#[test]
fn installing_an_eula_pack_without_accept_eula_fails_closed() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["source", "install", "na28"])
        .assert()
        .failure()
        .code(3) // ExitCode::CONSENT_REQUIRED
        .stderr(predicate::str::contains("eula").or(predicate::str::contains("EULA")));
}

#[test]
fn installing_a_manual_only_pack_fails_even_with_accept_eula() {
    // `na28`'s InstallSource is Manual; no transport exists to materialize
    // it regardless of EULA acceptance.
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["source", "install", "na28", "--accept-eula"])
        .assert()
        .failure();
}

#[test]
fn installing_an_unknown_pack_reports_source_not_found() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["source", "install", "does-not-exist"])
        .assert()
        .failure()
        .code(4); // ExitCode::DATA_UNAVAILABLE
}

#[test]
fn lock_generate_on_an_empty_install_writes_an_empty_but_valid_lockfile() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();
    let out = data_root.path().join("lockfile.json");

    cmd(data_root.path(), workspace_root.path())
        .args(["lock", "generate", "--out"])
        .arg(&out)
        .assert()
        .success();

    let contents = std::fs::read_to_string(&out).unwrap();
    assert!(contents.contains("lockfile_hash"));

    cmd(data_root.path(), workspace_root.path())
        .args(["lock", "verify", "--path"])
        .arg(&out)
        .arg("--json")
        .assert()
        .success();
}

#[test]
fn translate_without_an_installed_spine_reports_data_unavailable() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["translate", "John 1:18", "--session", "scholar-1"])
        .assert()
        .failure()
        .code(4); // ExitCode::DATA_UNAVAILABLE
}

#[test]
fn ack_rejects_a_malformed_reference() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["ack", "scholar-1", "not a verse id", "0"])
        .assert()
        .failure()
        .code(2); // ExitCode::CLI_ARGS
}

#[test]
fn job_list_on_a_fresh_engine_is_empty() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["job", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::trim().eq("[]"));
}

#[test]
fn bundle_verify_reports_missing_artifacts_for_an_empty_directory() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();
    let bundle_dir = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["bundle", "verify"])
        .arg(bundle_dir.path())
        .assert()
        .failure();
}

#[test]
fn doctor_reports_writable_roots_as_healthy() {
    let data_root = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    cmd(data_root.path(), workspace_root.path())
        .args(["doctor", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));
}
