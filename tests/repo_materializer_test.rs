mod common;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use git2::Repository;

use code_structure_service::core::repo_materializer::{
    materialize_git, materialize_git_unless_abandoned, materialize_git_with_timeout, MaterializeError,
};

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn clone_reports_head_and_replaces_stale_destination() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src.git");
    std::fs::create_dir_all(&src).unwrap();
    let repo = Repository::init(&src).unwrap();
    let _c1 = common::commit_file(&repo, Path::new("file.txt"), "v1", "c1");
    let c2 = common::commit_file(&repo, Path::new("file.txt"), "v2", "c2");

    let dest = tmp.path().join("repos").join("r1");
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("leftover.txt"), "from a previous attempt").unwrap();

    let res = materialize_git(src.to_string_lossy().as_ref(), &dest).unwrap();

    assert_eq!(res.repo_root, dest);
    assert_eq!(res.head_commit, Some(c2.to_string()));
    assert_eq!(std::fs::read_to_string(dest.join("file.txt")).unwrap(), "v2");
    assert!(!dest.join("leftover.txt").exists());
}

#[tokio::test]
async fn unreachable_source_is_a_git_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = materialize_git_with_timeout(
        tmp.path().join("missing.git").to_string_lossy().as_ref(),
        &tmp.path().join("out"),
        Duration::from_secs(30),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MaterializeError::Git(_)));
}

#[tokio::test]
async fn failed_clone_leaves_nothing_under_the_storage_root() {
    let tmp = tempfile::tempdir().unwrap();
    let repos = tmp.path().join("repos");
    let err = materialize_git_with_timeout(
        tmp.path().join("missing.git").to_string_lossy().as_ref(),
        &repos.join("r1"),
        Duration::from_secs(30),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MaterializeError::Git(_)));
    assert!(entries(&repos).is_empty());
}

#[test]
fn abandoned_clone_is_discarded_instead_of_moved_into_place() {
    let tmp = tempfile::tempdir().unwrap();
    let (_src, uri) = common::source_repo(tmp.path());
    let repos = tmp.path().join("repos");
    let dest = repos.join("r1");

    let err = materialize_git_unless_abandoned(&uri, &dest, &AtomicBool::new(true)).unwrap_err();

    assert!(matches!(err, MaterializeError::Abandoned | MaterializeError::Git(_)));
    assert!(!dest.exists());
    assert!(entries(&repos).is_empty());
}

#[test]
fn finished_clone_leaves_only_the_destination() {
    let tmp = tempfile::tempdir().unwrap();
    let (_src, uri) = common::source_repo(tmp.path());
    let repos = tmp.path().join("repos");

    materialize_git(&uri, &repos.join("r1")).unwrap();

    assert_eq!(entries(&repos), vec!["r1"]);
    assert!(repos.join("r1/src/Main.java").is_file());
}
