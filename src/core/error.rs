use std::path::PathBuf;

use crate::analyzer::AnalyzerError;
use crate::persistence::StoreError;

/// Failures a pipeline job can run into.
///
/// Everything except `ExternalTool` is job-fatal. `ExternalTool` raised while
/// analyzing a single file is absorbed by the dispatcher, which records the
/// file as unparsed and moves on.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid argument: {0}")]
    Validation(String),
    #[error("repository already exists: {existing_id}")]
    Conflict { existing_id: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("{tool} failed: {detail}")]
    ExternalTool { tool: &'static str, detail: String },
    #[error("cannot list files under {}: {detail}", root.display())]
    Enumeration { root: PathBuf, detail: String },
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { existing_id } => PipelineError::Conflict { existing_id },
            StoreError::Backend(detail) => PipelineError::Storage(detail),
        }
    }
}

impl From<AnalyzerError> for PipelineError {
    fn from(e: AnalyzerError) -> Self {
        PipelineError::ExternalTool {
            tool: "analyzer",
            detail: e.to_string(),
        }
    }
}
