use git2::build::RepoBuilder;
use git2::{FetchOptions, RemoteCallbacks};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Git(#[from] git2::Error),
    #[error("clone did not finish within {0:?}")]
    Timeout(Duration),
    #[error("clone abandoned")]
    Abandoned,
    #[error("clone task failed: {0}")]
    Join(String),
}

fn rmtree_retry(path: &Path, attempts: usize, delay: Duration) -> std::io::Result<()> {
    let mut last_err: Option<std::io::Error> = None;
    for _ in 0..attempts {
        match std::fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_err = Some(e);
                sleep(delay);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::other("failed to remove dir")))
}

#[derive(Debug, Clone)]
pub struct GitMaterializationResult {
    pub repo_root: PathBuf,
    pub head_commit: Option<String>,
}

/// Hidden sibling of `dest_dir` the clone is written into before it is moved into place.
fn staging_dir(dest_dir: &Path) -> PathBuf {
    let name = dest_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest_dir.with_file_name(format!(".{name}.clone-{}", uuid::Uuid::new_v4().simple()))
}

fn clone_into(git_url: &str, staging: &Path, abandoned: &AtomicBool) -> Result<Option<String>, MaterializeError> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(|_| !abandoned.load(Ordering::Relaxed));
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);

    let repo = RepoBuilder::new().fetch_options(fetch).clone(git_url, staging)?;
    let head_commit = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| oid.to_string());
    Ok(head_commit)
}

/// Clones `git_url` and moves the finished clone to `dest_dir`, replacing
/// whatever a previous attempt left there.
///
/// `dest_dir` only ever holds a complete clone. The clone is written into a
/// hidden sibling first; it is discarded instead of moved when it fails or
/// when `abandoned` is set before it finishes.
pub fn materialize_git_unless_abandoned(
    git_url: &str,
    dest_dir: &Path,
    abandoned: &AtomicBool,
) -> Result<GitMaterializationResult, MaterializeError> {
    if let Some(parent) = dest_dir.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let staging = staging_dir(dest_dir);

    let head_commit = match clone_into(git_url, &staging, abandoned) {
        Ok(head) if !abandoned.load(Ordering::Relaxed) => head,
        outcome => {
            if staging.exists() {
                rmtree_retry(&staging, 30, Duration::from_millis(100))?;
            }
            return Err(outcome.err().unwrap_or(MaterializeError::Abandoned));
        }
    };

    if dest_dir.exists() {
        rmtree_retry(dest_dir, 30, Duration::from_millis(100))?;
    }
    std::fs::rename(&staging, dest_dir)?;

    Ok(GitMaterializationResult {
        repo_root: dest_dir.to_path_buf(),
        head_commit,
    })
}

pub fn materialize_git(git_url: &str, dest_dir: &Path) -> Result<GitMaterializationResult, MaterializeError> {
    materialize_git_unless_abandoned(git_url, dest_dir, &AtomicBool::new(false))
}

/// Runs the clone on the blocking pool, giving up after `timeout`.
///
/// A timed-out clone is abandoned: libgit2 stops at its next transfer
/// progress callback, and whatever it wrote is removed rather than moved to
/// `dest_dir`.
pub async fn materialize_git_with_timeout(
    git_url: &str,
    dest_dir: &Path,
    timeout: Duration,
) -> Result<GitMaterializationResult, MaterializeError> {
    let git_url = git_url.to_string();
    let dest_dir = dest_dir.to_path_buf();
    let abandoned = Arc::new(AtomicBool::new(false));
    let task = tokio::task::spawn_blocking({
        let abandoned = abandoned.clone();
        move || materialize_git_unless_abandoned(&git_url, &dest_dir, &abandoned)
    });
    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.map_err(|e| MaterializeError::Join(e.to_string()))?,
        Err(_) => {
            abandoned.store(true, Ordering::Relaxed);
            Err(MaterializeError::Timeout(timeout))
        }
    }
}
