use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::analyzer::DynAnalyzer;
use crate::config::Config;
use crate::core::dispatcher::{spawn_parse, ParseContext};
use crate::core::events::{ErrorInfo, ErrorKind, Phase, ProgressEvent};
use crate::core::ingest::{spawn_ingestion, IngestContext};
use crate::core::workspace::Workspace;
use crate::persistence::{DynStore, RepositoryRecord};
use crate::web::protocol::{
    job_event_frames, parse_accepted_frame, progress_event_frames, terminal_frames, Frame,
};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub analyzer: DynAnalyzer,
    pub workspace: Workspace,
    pub clone_timeout: Duration,
    pub parse_batch_size: usize,
    pub progress_queue_capacity: usize,
}

impl AppState {
    pub fn from_config(cfg: &Config, store: DynStore, analyzer: DynAnalyzer) -> Self {
        Self {
            store,
            analyzer,
            workspace: Workspace::new(&cfg.storage_root),
            clone_timeout: cfg.clone_timeout,
            parse_batch_size: cfg.parse_batch_size,
            progress_queue_capacity: cfg.progress_queue_capacity,
        }
    }

    fn ingest_context(&self) -> IngestContext {
        IngestContext {
            store: self.store.clone(),
            workspace: self.workspace.clone(),
            clone_timeout: self.clone_timeout,
            queue_capacity: self.progress_queue_capacity,
        }
    }

    fn parse_context(&self) -> ParseContext {
        ParseContext {
            workspace: self.workspace.clone(),
            analyzer: self.analyzer.clone(),
            batch_size: self.parse_batch_size,
            queue_capacity: self.progress_queue_capacity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub uri: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/repo/add", get(add_repository))
        .route("/repo/list", get(list_repositories))
        .route("/repo/{id}/initial", get(parse_repository))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_repositories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RepositoryRecord>>, ApiError> {
    let records = state.store.list_all().await.map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(records))
}

async fn add_repository(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| submit_session(state, socket))
}

async fn parse_repository(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| parse_session(state, socket, id))
}

async fn send_frame(socket: &mut WebSocket, frame: Frame) -> Result<(), axum::Error> {
    let message = match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Close { code, reason } => Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })),
    };
    socket.send(message).await
}

/// Sends frames in order, stopping at the first failed send.
async fn send_frames(socket: &mut WebSocket, frames: Vec<Frame>) {
    for frame in frames {
        if let Err(e) = send_frame(socket, frame).await {
            warn!(error = %e, "could not send terminal frame");
            return;
        }
    }
}

/// Waits for the submission body. `Ok(None)` means the client left first;
/// `Err` carries the terminal frames to answer a bad first message with.
async fn read_submit_request(socket: &mut WebSocket) -> Result<Option<SubmitRequest>, Vec<Frame>> {
    loop {
        let message = match socket.recv().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                warn!(error = %e, "could not read submission");
                return Ok(None);
            }
            None => return Ok(None),
        };
        match message {
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return Ok(None),
            Message::Binary(_) => {
                warn!("got unexpected websocket message type");
                return Err(terminal_frames(StatusCode::BAD_REQUEST, "", "Expected TextMessage"));
            }
            Message::Text(text) => {
                return serde_json::from_str::<SubmitRequest>(text.as_str())
                    .map(Some)
                    .map_err(|e| {
                        warn!(error = %e, "could not decode submission");
                        terminal_frames(StatusCode::BAD_REQUEST, "", "Invalid message")
                    });
            }
        }
    }
}

/// Forwards job events until the terminal frame is sent.
///
/// The job's cancellation token is dropped (and so cancelled) when this
/// returns, whether the job finished or the client disconnected.
async fn pump_events<E>(
    socket: &mut WebSocket,
    mut events: mpsc::Receiver<E>,
    cancel: CancellationToken,
    to_frames: impl Fn(&E) -> Vec<Frame>,
    fallback: Vec<Frame>,
) {
    let _guard = cancel.drop_guard();
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                for frame in to_frames(&event) {
                    let closing = frame.is_close();
                    if let Err(e) = send_frame(socket, frame).await {
                        warn!(error = %e, "could not send event");
                        return;
                    }
                    if closing {
                        return;
                    }
                }
            }
            incoming = socket.recv() => match incoming {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                    info!("client disconnected before the job finished");
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    error!("job stream ended without a terminal event");
    send_frames(socket, fallback).await;
}

async fn submit_session(state: Arc<AppState>, mut socket: WebSocket) {
    let request = match read_submit_request(&mut socket).await {
        Ok(Some(request)) => request,
        Ok(None) => return,
        Err(frames) => {
            send_frames(&mut socket, frames).await;
            return;
        }
    };

    info!(uri = %request.uri, "repository submitted");
    let cancel = CancellationToken::new();
    let events = spawn_ingestion(state.ingest_context(), request.uri, cancel.clone());
    let fallback = terminal_frames(StatusCode::INTERNAL_SERVER_ERROR, "", Phase::Failed.as_str());
    pump_events(&mut socket, events, cancel, job_event_frames, fallback).await;
}

async fn parse_session(state: Arc<AppState>, mut socket: WebSocket, id: String) {
    let lookup_failure = match state.store.find_by_id(&id).await {
        Ok(Some(_)) => None,
        Ok(None) => {
            warn!(repo_id = %id, "parse requested for unknown repository");
            Some(ErrorInfo {
                kind: ErrorKind::NotFound,
                message: format!("no repository with id {id}"),
            })
        }
        Err(e) => {
            error!(repo_id = %id, error = %e, "could not look up repository");
            Some(ErrorInfo {
                kind: ErrorKind::Internal,
                message: e.to_string(),
            })
        }
    };
    if let Some(failure) = lookup_failure {
        send_frames(&mut socket, progress_event_frames(&id, &ProgressEvent::failed(failure))).await;
        return;
    }

    if let Err(e) = send_frame(&mut socket, parse_accepted_frame(&id)).await {
        warn!(repo_id = %id, error = %e, "could not accept parse request");
        return;
    }

    let cancel = CancellationToken::new();
    let events = spawn_parse(state.parse_context(), id.clone(), cancel.clone());
    let fallback = terminal_frames(StatusCode::INTERNAL_SERVER_ERROR, &id, Phase::Failed.as_str());
    pump_events(&mut socket, events, cancel, |event| progress_event_frames(&id, event), fallback).await;
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("request_failed: {}", self.message);
        }
        let text = self.status.canonical_reason().unwrap_or("error");
        (self.status, Json(json!({ "detail": text }))).into_response()
    }
}
