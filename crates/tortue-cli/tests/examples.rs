use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap().parent().unwrap().to_path_buf()
}

fn tortue() -> Command {
    Command::cargo_bin("tortue").unwrap()
}

#[test]
fn runs_square_demo() {
    let root = workspace_root();
    let mut cmd = tortue();
    cmd.arg("run").arg(root.join("demos/square.logo"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("done"))
        .stdout(predicate::str::contains("forward 20"))
        .stdout(predicate::str::contains("right 90"));
}

#[test]
fn runs_spiral_demo() {
    let root = workspace_root();
    let mut cmd = tortue();
    cmd.arg("run").arg(root.join("demos/spiral.logo"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("spiral complete"))
        .stdout(predicate::str::contains("forward 30"))
        .stdout(predicate::str::contains("forward 5"));
}

#[test]
fn runs_dashes_demo() {
    let root = workspace_root();
    let mut cmd = tortue();
    cmd.arg("run").arg(root.join("demos/dashes.logo"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("5\n"))
        .stdout(predicate::str::contains("penup"))
        .stdout(predicate::str::contains("dashed line drawn"));
}

#[test]
fn compile_emits_canonical_listing() {
    let root = workspace_root();
    let mut cmd = tortue();
    cmd.arg("compile").arg(root.join("demos/square.logo"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("DEF square"))
        .stdout(predicate::str::contains("JUMP_IF_FALSE"))
        .stdout(predicate::str::contains("CALL_BUILTIN FORWARD"))
        .stdout(predicate::str::contains("CALL square 1"))
        .stdout(predicate::str::contains("HALT"));
}

#[test]
fn compiled_listing_replays_identically() {
    let root = workspace_root();
    let src = root.join("demos/square.logo");

    let direct = tortue().arg("run").arg(&src).output().unwrap();
    assert!(direct.status.success());

    let tmp_dir = tempfile::tempdir().unwrap();
    let listing = tmp_dir.path().join("square.lst");
    tortue()
        .arg("compile")
        .arg(&src)
        .arg("-o")
        .arg(&listing)
        .assert()
        .success();

    let replayed = tortue()
        .arg("run")
        .arg("--listing")
        .arg(&listing)
        .output()
        .unwrap();
    assert!(replayed.status.success());
    assert_eq!(direct.stdout, replayed.stdout);
}

#[test]
fn parse_error_is_nonzero_and_reports_every_statement() {
    let bad = "forward +\npenup\nback *\n"; // malformed on purpose
    let tmp_dir = tempfile::tempdir().unwrap();
    let bad_path = tmp_dir.path().join("bad.logo");
    std::fs::write(&bad_path, bad).unwrap();

    let mut cmd = tortue();
    cmd.arg("run").arg(bad_path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("syntax error").count(2));
}

#[test]
fn lexical_error_is_recovered() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("odd.logo");
    std::fs::write(&path, "forward @ 10\n").unwrap();

    let mut cmd = tortue();
    cmd.arg("run").arg(path);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("lexical error"))
        .stdout(predicate::str::contains("forward 10"));
}

#[test]
fn runtime_error_is_nonzero() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("undef.logo");
    std::fs::write(&path, "write :nope\n").unwrap();

    let mut cmd = tortue();
    cmd.arg("run").arg(path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Undefined variable 'nope'"));
}

#[test]
fn missing_file_is_nonzero() {
    let mut cmd = tortue();
    cmd.arg("run").arg("no-such-file.logo");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
