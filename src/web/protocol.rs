//! Maps job events to wire frames.
//!
//! Every payload is a [`WireMessage`]. Non-terminal events become text
//! frames; terminal ones ride in a normal-closure close frame, except a
//! successful parse which sends its (large) result as text and then closes.
//! A terminal envelope too long for a close reason is sent the same way, as
//! text followed by a close carrying only the status text.

use axum::http::StatusCode;
use serde::Serialize;

use crate::core::events::{ErrorKind, IngestFailure, JobEvent, Phase, ProgressEvent};
use crate::core::model::ProjectModel;
use crate::core::uri::INVALID_URI_REASON;

/// WebSocket close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Longest close reason a control frame can carry (125 bytes minus the code).
pub const MAX_CLOSE_REASON: usize = 123;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage<B> {
    pub statuscode: u16,
    pub statustext: String,
    pub body: B,
}

impl<B: Serialize> WireMessage<B> {
    pub fn new(status: StatusCode, body: B) -> Self {
        Self {
            statuscode: status.as_u16(),
            statustext: status.canonical_reason().unwrap_or("").to_string(),
            body,
        }
    }

    pub fn to_json(&self) -> String {
        // Wire bodies are plain structs of strings and numbers.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBody {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseBody<'a> {
    pub id: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<&'a str>,
    pub parsed_file_count: usize,
    pub skipped_file_count: usize,
    pub file_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a ProjectModel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

impl Frame {
    pub fn is_close(&self) -> bool {
        matches!(self, Frame::Close { .. })
    }

    fn close_with(message: String) -> Self {
        Frame::Close {
            code: CLOSE_NORMAL,
            reason: message,
        }
    }
}

pub fn status_message(status: StatusCode, id: &str, text: &str) -> WireMessage<StatusBody> {
    WireMessage::new(
        status,
        StatusBody {
            id: id.to_string(),
            status: text.to_string(),
        },
    )
}

/// Frames ending a session with a status envelope. The envelope is the close
/// reason when it fits; otherwise it goes out as text and the close carries `text`.
pub fn terminal_frames(status: StatusCode, id: &str, text: &str) -> Vec<Frame> {
    let envelope = status_message(status, id, text).to_json();
    if envelope.len() <= MAX_CLOSE_REASON {
        vec![Frame::close_with(envelope)]
    } else {
        vec![Frame::Text(envelope), Frame::close_with(text.to_string())]
    }
}

fn ingest_failure_status(reason: &IngestFailure) -> (StatusCode, &'static str) {
    match reason {
        IngestFailure::InvalidUri => (StatusCode::BAD_REQUEST, INVALID_URI_REASON),
        IngestFailure::AlreadyExists => (StatusCode::CONFLICT, "Repository already exists"),
        IngestFailure::Database => (StatusCode::CONFLICT, "Database error"),
        IngestFailure::Clone(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Clone failed"),
    }
}

pub fn job_event_frames(event: &JobEvent) -> Vec<Frame> {
    match event {
        JobEvent::Cloning { id } => vec![Frame::Text(
            status_message(StatusCode::ACCEPTED, id, Phase::Cloning.as_str()).to_json(),
        )],
        JobEvent::Done { id } => terminal_frames(StatusCode::CREATED, id, Phase::Done.as_str()),
        JobEvent::Failed { id, reason } => {
            let (status, text) = ingest_failure_status(reason);
            terminal_frames(status, id, text)
        }
    }
}

/// First message of a parse session, sent once the repository is known.
pub fn parse_accepted_frame(id: &str) -> Frame {
    Frame::Text(status_message(StatusCode::ACCEPTED, id, Phase::Parsing.as_str()).to_json())
}

pub fn progress_event_frames(id: &str, event: &ProgressEvent) -> Vec<Frame> {
    match event.phase {
        Phase::Failed => {
            let status = match event.error.as_ref().map(|e| e.kind) {
                Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            terminal_frames(status, id, Phase::Failed.as_str())
        }
        Phase::Done => {
            let body = ParseBody {
                id,
                status: Phase::Done.as_str(),
                current_file: None,
                parsed_file_count: event.parsed_file_count,
                skipped_file_count: event.skipped_file_count,
                file_count: event.file_count,
                result: event.result.as_ref(),
            };
            vec![
                Frame::Text(WireMessage::new(StatusCode::OK, body).to_json()),
                Frame::close_with(Phase::Done.as_str().to_string()),
            ]
        }
        Phase::Parsing | Phase::Cloning => {
            let body = ParseBody {
                id,
                status: Phase::Parsing.as_str(),
                current_file: event.current_file.as_deref(),
                parsed_file_count: event.parsed_file_count,
                skipped_file_count: event.skipped_file_count,
                file_count: event.file_count,
                result: None,
            };
            vec![Frame::Text(WireMessage::new(StatusCode::OK, body).to_json())]
        }
    }
}
