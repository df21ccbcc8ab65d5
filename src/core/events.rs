use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::core::model::ProjectModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Cloning,
    Parsing,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Cloning => "Cloning",
            Phase::Parsing => "Parsing",
            Phase::Done => "Done",
            Phase::Failed => "Failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submission ended without a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestFailure {
    InvalidUri,
    AlreadyExists,
    Database,
    Clone(String),
}

/// Phase transitions of one ingestion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Cloning { id: String },
    Done { id: String },
    /// `id` is empty when the submission was rejected before any record existed.
    Failed { id: String, reason: IngestFailure },
}

impl JobEvent {
    pub fn id(&self) -> &str {
        match self {
            JobEvent::Cloning { id } | JobEvent::Done { id } | JobEvent::Failed { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Enumeration,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

/// Cumulative snapshot of a parse job.
///
/// `parsed_file_count + skipped_file_count <= file_count` on every snapshot,
/// with equality on the terminal one.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub current_file: Option<String>,
    pub parsed_file_count: usize,
    pub skipped_file_count: usize,
    pub file_count: usize,
    pub error: Option<ErrorInfo>,
    pub result: Option<ProjectModel>,
}

impl ProgressEvent {
    pub fn failed(error: ErrorInfo) -> Self {
        Self {
            phase: Phase::Failed,
            current_file: None,
            parsed_file_count: 0,
            skipped_file_count: 0,
            file_count: 0,
            error: Some(error),
            result: None,
        }
    }
}

/// The consumer went away or the job was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("job cancelled")]
pub struct Cancelled;

/// Producer half of a job's bounded event queue.
///
/// Every send also watches the job's cancellation token, so a producer can
/// never block on a consumer that is gone.
#[derive(Debug, Clone)]
pub struct EventSink<E> {
    tx: mpsc::Sender<E>,
    cancel: CancellationToken,
}

impl<E> EventSink<E> {
    pub fn new(tx: mpsc::Sender<E>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Bounded queue plus sink for it. Capacity is clamped to at least one slot.
    pub fn channel(capacity: usize, cancel: CancellationToken) -> (Self, mpsc::Receiver<E>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx, cancel), rx)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves once the job is cancelled or its consumer is gone.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.tx.closed() => {}
        }
    }

    /// Waits for queue space unless the job is cancelled first.
    pub async fn emit(&self, event: E) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            sent = self.tx.send(event) => sent.map_err(|_| Cancelled),
        }
    }

    /// Enqueues without waiting. A full queue drops the event.
    pub fn offer(&self, event: E) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::debug!("event queue full, dropping snapshot");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(Cancelled),
        }
    }
}
