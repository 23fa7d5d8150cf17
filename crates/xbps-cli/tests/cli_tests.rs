//! End-to-end tests exercising the `xbps` binary against an empty,
//! repository-less root. These cover the argument-parsing and exit-code
//! surface without needing a live repository.

use assert_cmd::Command;
use predicates::prelude::*;

fn xbps(rootdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("xbps").unwrap();
    cmd.arg("--rootdir").arg(rootdir).arg("--cachedir").arg(rootdir.join("cache"));
    cmd
}

#[test]
fn install_with_no_repositories_reports_not_supported() {
    let dir = tempfile::tempdir().unwrap();
    xbps(dir.path())
        .args(["install", "somepkg"])
        .assert()
        .failure()
        .code(predicate::eq(95)) // ENOTSUP on Linux
        .stderr(predicate::str::contains("no repositories"));
}

#[test]
fn list_on_an_empty_root_reports_nothing_installed() {
    let dir = tempfile::tempdir().unwrap();
    xbps(dir.path()).arg("list").assert().success().stdout(predicate::str::contains("no packages installed"));
}

#[test]
fn search_with_no_repositories_reports_no_matches() {
    let dir = tempfile::tempdir().unwrap();
    xbps(dir.path()).args(["search", "foo"]).assert().success().stdout(predicate::str::contains("no matches"));
}

#[test]
fn remove_of_an_uninstalled_package_fails() {
    let dir = tempfile::tempdir().unwrap();
    xbps(dir.path()).args(["remove", "notinstalled"]).assert().failure();
}

#[test]
fn missing_subcommand_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    xbps(dir.path()).assert().failure().stderr(predicate::str::contains("Usage"));
}
