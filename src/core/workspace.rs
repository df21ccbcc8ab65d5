use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

fn is_safe_segment(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 128 {
        return false;
    }
    if !bytes[0].is_ascii_alphanumeric() {
        return false;
    }
    bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(*b, b'_' | b'.' | b'-'))
}

/// Directory name for a repository id. Ids that are not plain path segments
/// (slashes, `..`, whitespace) are hashed so they can never escape the root.
fn stable_key(value: &str) -> String {
    if is_safe_segment(value) {
        return value.to_string();
    }
    let digest = hex::encode(Sha256::digest(value.as_bytes()));
    format!("sha256-{}", &digest[..16])
}

/// Storage layout: one clone per repository id directly under `root`.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn repo_dir(&self, repo_id: &str) -> PathBuf {
        self.root.join(stable_key(repo_id))
    }
}
