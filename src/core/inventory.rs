use std::path::{Component, Path, PathBuf};

use crate::core::error::PipelineError;
use crate::core::workspace::Workspace;

/// Version-control metadata directory skipped during enumeration.
const VCS_DIR: &str = ".git";

fn to_posix_rel_path(repo_root: &Path, p: &Path) -> String {
    let rel = p.strip_prefix(repo_root).unwrap_or(p);
    let mut out = String::new();
    for c in rel.components() {
        let Component::Normal(os) = c else { continue };
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&os.to_string_lossy());
    }
    out
}

/// Regular files under `repo_root`, excluding anything inside `.git`.
///
/// Any walk error fails the whole listing; a partial file set is never returned.
pub fn iter_repo_files(repo_root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let enumeration_error = |detail: String| PipelineError::Enumeration {
        root: repo_root.to_path_buf(),
        detail,
    };

    if !repo_root.is_dir() {
        return Err(enumeration_error("repository directory is missing".to_string()));
    }

    let walker = walkdir::WalkDir::new(repo_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != VCS_DIR);

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| enumeration_error(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        files.push(entry.into_path());
    }
    files.sort_by_cached_key(|p| to_posix_rel_path(repo_root, p));
    Ok(files)
}

/// Lists the files of repository `repo_id` as paths rooted at the storage root.
pub fn list_repo_files(workspace: &Workspace, repo_id: &str) -> Result<Vec<PathBuf>, PipelineError> {
    iter_repo_files(&workspace.repo_dir(repo_id))
}
