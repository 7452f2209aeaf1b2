use std::path::Path;
use std::process::Command;

use git2::{Commit, Repository, Signature};

fn commit(repo: &Repository, files: &[(&str, &str)], author: &str) {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, content) in files {
        std::fs::write(workdir.join(path), content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now(author, &format!("{author}@example.com")).unwrap();
    let parents: Vec<Commit<'_>> = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parent_refs)
        .unwrap();
}

fn scratch_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(&repo, &[("lib.rs", "a\n"), ("api.rs", "x\n")], "alice");
    commit(&repo, &[("lib.rs", "a\nb\n"), ("api.rs", "x\ny\n")], "bob");
    commit(&repo, &[("lib.rs", "a\nb\nc\n")], "alice");
    dir
}

#[test]
fn analyze_json_and_stored_report() {
    let repo = scratch_repo();
    let out = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_vitals"))
        .args(["analyze", "--format", "json", "--run-id", "first", "--out-dir"])
        .arg(out.path())
        .arg("--path")
        .arg(repo.path())
        .current_dir(repo.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "vitals analyze failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["totalCommits"], 3);
    assert_eq!(report["totalFiles"], 2);
    assert_eq!(report["hotspots"]["files"][0]["filePath"], "lib.rs");

    let stored = std::fs::read_to_string(out.path().join("first.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["totalCommits"], 3);
}

#[test]
fn compare_unknown_reference_fails() {
    let repo = scratch_repo();
    let output = Command::new(env!("CARGO_BIN_EXE_vitals"))
        .args(["compare", "--from", "no-such-tag", "--to", "HEAD"])
        .current_dir(repo.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no-such-tag"));
}

#[test]
fn outside_a_repository_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_vitals"))
        .args(["hotspots", "--path"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}
