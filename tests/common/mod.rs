#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};
use tokio::sync::mpsc;

use code_structure_service::analyzer::{AnalyzerError, FileAnalyzer, Language};
use code_structure_service::core::model::{FileModel, FunctionModel, NamespaceModel};
use code_structure_service::persistence::{RepositoryRecord, RepositoryStore, StoreError};

pub fn commit_file(repo: &Repository, rel: &Path, contents: &str, message: &str) -> Oid {
    let workdir = repo.workdir().expect("non-bare repo workdir");
    let abs = workdir.join(rel);
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&abs, contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(rel).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parents: Vec<git2::Commit<'_>> = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .and_then(|oid| repo.find_commit(oid).ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, parent_refs.as_slice())
        .unwrap()
}

/// A local repository whose directory name ends in `.git`, usable as a clone uri.
pub fn source_repo(parent: &Path) -> (PathBuf, String) {
    let dir = parent.join("upstream.git");
    std::fs::create_dir_all(&dir).unwrap();
    let repo = Repository::init(&dir).unwrap();
    commit_file(&repo, Path::new("README.md"), "# upstream\n", "c1");
    commit_file(&repo, Path::new("src/Main.java"), "class Main {}\n", "c2");
    let uri = dir.to_string_lossy().to_string();
    (dir, uri)
}

pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let p = root.join(rel);
    if let Some(parent) = p.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(p, contents).unwrap();
}

pub async fn drain<E>(mut rx: mpsc::Receiver<E>) -> Vec<E> {
    let mut out = Vec::new();
    while let Some(e) = rx.recv().await {
        out.push(e);
    }
    out
}

/// Pretends to be the external analyzer. Java files get a `HelloWorld`
/// namespace holding `main` on lines 6-8; files named `broken.*` fail.
#[derive(Default)]
pub struct FakeAnalyzer {
    pub calls: Mutex<Vec<(PathBuf, Language)>>,
}

impl FakeAnalyzer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl FileAnalyzer for FakeAnalyzer {
    async fn analyze(&self, path: &Path, language: Language) -> Result<FileModel, AnalyzerError> {
        self.calls.lock().unwrap().push((path.to_path_buf(), language));
        let stem = path.file_stem().unwrap().to_string_lossy();
        if stem == "broken" {
            return Err(AnalyzerError::Malformed("truncated output".to_string()));
        }
        let mut model = FileModel {
            file_name: path.to_string_lossy().to_string(),
            parsed: true,
            lines_in_file: 8,
            ..FileModel::default()
        };
        if language == Language::Java {
            model.namespaces.push(NamespaceModel {
                name: "HelloWorld".to_string(),
                line_nr: 0,
                functions: vec![FunctionModel {
                    name: "main".to_string(),
                    start_line: 6,
                    end_line: 8,
                }],
                ..NamespaceModel::default()
            });
        }
        Ok(model)
    }
}

/// Store whose backend is always down.
pub struct UnavailableStore;

#[async_trait]
impl RepositoryStore for UnavailableStore {
    async fn insert(&self, _uri: &str) -> Result<RepositoryRecord, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<RepositoryRecord>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn list_all(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}

/// Analyzer that never finishes. Every call is announced on `started`, and
/// `dropped` flips once an in-flight call is abandoned by its caller.
pub struct StuckAnalyzer {
    pub calls: Mutex<Vec<PathBuf>>,
    pub dropped: Arc<AtomicBool>,
    started: mpsc::UnboundedSender<PathBuf>,
}

impl StuckAnalyzer {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PathBuf>) {
        let (started, rx) = mpsc::unbounded_channel();
        let analyzer = Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicBool::new(false)),
            started,
        });
        (analyzer, rx)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileAnalyzer for StuckAnalyzer {
    async fn analyze(&self, path: &Path, _language: Language) -> Result<FileModel, AnalyzerError> {
        let _flag = SetOnDrop(self.dropped.clone());
        self.calls.lock().unwrap().push(path.to_path_buf());
        let _ = self.started.send(path.to_path_buf());
        std::future::pending().await
    }
}

/// Polls `cond` until it holds, failing the test after five seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
