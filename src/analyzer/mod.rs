use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::model::FileModel;

pub mod external;
pub mod line_count;
pub mod output;
pub mod routing;

pub use routing::Language;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("could not count lines: {0}")]
    LineCount(#[source] std::io::Error),
    #[error("could not start analyzer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("analyzer exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("analyzer did not finish within {0:?}")]
    Timeout(std::time::Duration),
    #[error("could not decode analyzer output: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed analyzer output: {0}")]
    Malformed(String),
}

/// Produces the structural summary of a single source file.
#[async_trait]
pub trait FileAnalyzer: Send + Sync {
    /// `Ok` results are always `parsed: true`, with `file_name` set to `path`.
    async fn analyze(&self, path: &Path, language: Language) -> Result<FileModel, AnalyzerError>;
}

pub type DynAnalyzer = Arc<dyn FileAnalyzer>;
