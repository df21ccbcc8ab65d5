use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analyzer::{DynAnalyzer, FileAnalyzer, Language};
use crate::core::error::PipelineError;
use crate::core::events::{Cancelled, ErrorInfo, ErrorKind, EventSink, Phase, ProgressEvent};
use crate::core::inventory::list_repo_files;
use crate::core::model::{FileModel, ProjectModel};
use crate::core::sanitize::sanitize;
use crate::core::workspace::Workspace;

#[derive(Clone)]
pub struct ParseContext {
    pub workspace: Workspace,
    pub analyzer: DynAnalyzer,
    pub batch_size: usize,
    pub queue_capacity: usize,
}

/// Running counts of one parse job.
#[derive(Debug, Default)]
struct Tally {
    parsed: usize,
    skipped: usize,
    file_count: usize,
    current_file: Option<String>,
}

impl Tally {
    fn snapshot(&self, phase: Phase) -> ProgressEvent {
        ProgressEvent {
            phase,
            current_file: self.current_file.clone(),
            parsed_file_count: self.parsed,
            skipped_file_count: self.skipped,
            file_count: self.file_count,
            error: None,
            result: None,
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Analyzes `files` one at a time, in order, and reports progress to `sink`.
///
/// A snapshot is offered after the file at every index divisible by
/// `batch_size`; a full queue drops it rather than stalling the job. The
/// terminal `Done` event carries the sanitized project model.
pub async fn dispatch_files(
    repo_id: &str,
    files: &[PathBuf],
    batch_size: usize,
    analyzer: &dyn FileAnalyzer,
    storage_root: &Path,
    sink: &EventSink<ProgressEvent>,
) -> Result<ProjectModel, Cancelled> {
    let batch_size = batch_size.max(1);
    let mut tally = Tally {
        file_count: files.len(),
        ..Tally::default()
    };
    let mut project = ProjectModel::default();

    for (n, path) in files.iter().enumerate() {
        if sink.is_cancelled() {
            info!(repo_id, processed = n, "parse cancelled");
            return Err(Cancelled);
        }

        tally.current_file = Some(base_name(path));
        let file_name = path.to_string_lossy().into_owned();

        let file = match Language::from_path(path) {
            Some(language) => {
                let outcome = tokio::select! {
                    biased;
                    _ = sink.cancelled() => {
                        info!(repo_id, file = %path.display(), "parse cancelled during analysis");
                        return Err(Cancelled);
                    }
                    outcome = analyzer.analyze(path, language) => outcome,
                };
                match outcome {
                    Ok(mut model) => {
                        model.file_name = file_name;
                        tally.parsed += 1;
                        model
                    }
                    Err(e) => {
                        let e = PipelineError::from(e);
                        warn!(repo_id, file = %path.display(), error = %e, "could not analyze file");
                        tally.skipped += 1;
                        FileModel::unparsed(file_name)
                    }
                }
            }
            None => {
                debug!(repo_id, file = %path.display(), "no analyzer for file");
                tally.skipped += 1;
                FileModel::unparsed(file_name)
            }
        };
        project.files.push(file);

        if n % batch_size == 0 {
            sink.offer(tally.snapshot(Phase::Parsing))?;
        }
    }

    let project = sanitize(project, storage_root);
    let mut done = tally.snapshot(Phase::Done);
    done.current_file = None;
    done.result = Some(project.clone());
    sink.emit(done).await?;
    info!(repo_id, parsed = tally.parsed, skipped = tally.skipped, "parse finished");
    Ok(project)
}

/// Enumerates the repository's files and dispatches them. Failure to
/// enumerate ends the job with a `Failed` event and no result.
pub async fn run_parse(ctx: &ParseContext, repo_id: &str, sink: &EventSink<ProgressEvent>) -> Result<(), Cancelled> {
    let files = match list_repo_files(&ctx.workspace, repo_id) {
        Ok(files) => files,
        Err(e) => {
            warn!(repo_id, error = %e, "could not enumerate repository files");
            return sink
                .emit(ProgressEvent::failed(ErrorInfo {
                    kind: ErrorKind::Enumeration,
                    message: e.to_string(),
                }))
                .await;
        }
    };

    dispatch_files(
        repo_id,
        &files,
        ctx.batch_size,
        ctx.analyzer.as_ref(),
        &ctx.workspace.root,
        sink,
    )
    .await
    .map(|_| ())
}

/// Starts a parse job in the background and returns its event stream.
pub fn spawn_parse(ctx: ParseContext, repo_id: String, cancel: CancellationToken) -> mpsc::Receiver<ProgressEvent> {
    let (sink, rx) = EventSink::channel(ctx.queue_capacity, cancel);
    tokio::spawn(async move {
        if run_parse(&ctx, &repo_id, &sink).await.is_err() {
            info!(repo_id = %repo_id, "parse consumer went away");
        }
    });
    rx
}
