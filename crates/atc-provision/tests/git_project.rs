//! `GitProject` against a real repository. Skipped when git is unavailable.

use std::path::Path;
use std::process::Command;

use atc_common::SystemRunner;
use atc_provision::{GitProject, ProjectRepository};

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn run_git(root: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git command failed: git -C {:?} {:?}: {}",
        root,
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo(root: &Path) {
    run_git(root, &["init", "-q"]);
    run_git(root, &["config", "user.name", "ATC Test"]);
    run_git(root, &["config", "user.email", "atc@example.org"]);
    run_git(root, &["config", "commit.gpgsign", "false"]);
    std::fs::create_dir_all(root.join("resources/models")).unwrap();
    std::fs::write(root.join("resources/models/pin.txt"), "v1").unwrap();
    std::fs::write(root.join("README.md"), "game").unwrap();
    run_git(root, &["add", "."]);
    run_git(root, &["commit", "-q", "-m", "initial"]);
}

#[test]
fn clean_index_has_no_staged_changes() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let models = dir.path().join("resources/models");

    let project = GitProject::new(SystemRunner, dir.path());
    project.stage(&models).unwrap();

    assert!(!project.has_staged_changes(&models).unwrap());
}

#[test]
fn commit_records_only_the_models_path() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let models = dir.path().join("resources/models");
    std::fs::write(models.join("pin.txt"), "v2").unwrap();
    std::fs::write(dir.path().join("README.md"), "game, edited").unwrap();
    run_git(dir.path(), &["add", "README.md"]);

    let project = GitProject::new(SystemRunner, dir.path());
    project.stage(&models).unwrap();
    assert!(project.has_staged_changes(&models).unwrap());

    let commit = project.commit(&models, "Update models submodule").unwrap();

    assert_eq!(commit, run_git(dir.path(), &["rev-parse", "HEAD"]));
    let changed = run_git(dir.path(), &["show", "--name-only", "--format=", "HEAD"]);
    assert_eq!(changed, "resources/models/pin.txt");
    assert_eq!(
        run_git(dir.path(), &["log", "-1", "--format=%s"]),
        "Update models submodule"
    );
    assert!(!project.has_staged_changes(&models).unwrap());
}
