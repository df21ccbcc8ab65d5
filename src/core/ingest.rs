use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::events::{Cancelled, EventSink, IngestFailure, JobEvent};
use crate::core::repo_materializer::materialize_git_with_timeout;
use crate::core::uri::validate_uri;
use crate::core::workspace::Workspace;
use crate::core::error::PipelineError;
use crate::persistence::{DynStore, RepositoryRecord};

#[derive(Clone)]
pub struct IngestContext {
    pub store: DynStore,
    pub workspace: Workspace,
    pub clone_timeout: Duration,
    pub queue_capacity: usize,
}

/// Starts an ingestion job in the background and returns its event stream.
///
/// Cancelling `cancel` (or dropping the receiver) stops event delivery; the
/// job never blocks on a consumer that has gone away.
pub fn spawn_ingestion(ctx: IngestContext, uri: String, cancel: CancellationToken) -> mpsc::Receiver<JobEvent> {
    let (sink, rx) = EventSink::channel(ctx.queue_capacity, cancel);
    tokio::spawn(async move {
        if run_ingestion(&ctx, &uri, &sink).await.is_err() {
            info!(uri = %uri, "ingestion consumer went away");
        }
    });
    rx
}

/// validate -> persist -> clone -> report, for one submitted uri.
pub async fn run_ingestion(ctx: &IngestContext, uri: &str, sink: &EventSink<JobEvent>) -> Result<(), Cancelled> {
    if let Err(e) = validate_uri(uri) {
        warn!(uri = %uri, error = %e, "rejected submission");
        return sink
            .emit(JobEvent::Failed {
                id: String::new(),
                reason: IngestFailure::InvalidUri,
            })
            .await;
    }

    let record = match ctx.store.insert(uri).await.map_err(PipelineError::from) {
        Ok(record) => record,
        Err(PipelineError::Conflict { existing_id }) => {
            info!(uri = %uri, repo_id = %existing_id, "repository already exists");
            return sink
                .emit(JobEvent::Failed {
                    id: existing_id,
                    reason: IngestFailure::AlreadyExists,
                })
                .await;
        }
        Err(e) => {
            error!(uri = %uri, error = %e, "could not store repository");
            return sink
                .emit(JobEvent::Failed {
                    id: String::new(),
                    reason: IngestFailure::Database,
                })
                .await;
        }
    };

    let RepositoryRecord { id, uri } = record;
    sink.emit(JobEvent::Cloning { id: id.clone() }).await?;

    let dest = ctx.workspace.repo_dir(&id);
    let outcome = materialize_git_with_timeout(&uri, &dest, ctx.clone_timeout).await;
    let event = match outcome {
        Ok(res) => {
            info!(
                repo_id = %id,
                head = res.head_commit.as_deref().unwrap_or("unknown"),
                "clone finished"
            );
            JobEvent::Done { id }
        }
        Err(e) => {
            error!(repo_id = %id, uri = %uri, error = %e, "clone failed");
            JobEvent::Failed {
                id,
                reason: IngestFailure::Clone(e.to_string()),
            }
        }
    };
    sink.emit(event).await
}
