//! HTTP API server for integration with other systems.
//!
//! Every UI session gets a server-side [`Session`] behind its own lock, so
//! two submits never interleave within a session while different sessions
//! proceed in parallel.

use crate::app::App;
use crate::chat::{ChatController, SubmitError, SubmitOutcome};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::PeonError;
use crate::identity::user_name_or_unknown;
use crate::render::visible_turns;
use crate::session::{Session, Turn};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Header carrying the caller's display name.
///
/// The value is taken as-is and decides which history rows a caller may read,
/// so it must be set by a trusted proxy or front end, never by the browser.
pub const USER_HEADER: &str = "x-user-name";

/// Shared application state.
pub struct AppState {
    controller: ChatController,
    settings: Settings,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl AppState {
    pub fn new(controller: ChatController, settings: Settings) -> Self {
        Self {
            controller,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn session(&self, handle: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&handle).cloned()
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{handle}", get(get_session).delete(end_session))
        .route("/sessions/{handle}/messages", post(post_message))
        .route("/sessions/{handle}/new-chat", post(new_chat))
        .route("/sessions/{handle}/history", get(session_history))
        .route("/history", get(history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let app = App::new(settings).await?;
    let state = Arc::new(AppState::new(app.controller().clone(), app.settings().clone()));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Peon API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Start session", "POST /sessions");
    Output::kv("Transcript", "GET  /sessions/{handle}");
    Output::kv("Ask", "POST /sessions/{handle}/messages");
    Output::kv("New chat", "POST /sessions/{handle}/new-chat");
    Output::kv("End session", "DELETE /sessions/{handle}");
    Output::kv("Session history", "GET  /sessions/{handle}/history");
    Output::kv("History", "GET  /history");
    println!();
    Output::info(&format!("Callers identify themselves with the {} header.", USER_HEADER));
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize)]
struct SessionCreated {
    handle: Uuid,
    session_id: String,
    user_name: String,
}

#[derive(Serialize)]
struct TranscriptResponse {
    session_id: String,
    user_name: String,
    hidden_turns: usize,
    turns: Vec<Turn>,
}

#[derive(Deserialize)]
struct MessageRequest {
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
struct MessageResponse {
    turn: Turn,
    saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

fn session_not_found(handle: Uuid) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Session not found: {}", handle))
}

fn caller(headers: &HeaderMap) -> String {
    user_name_or_unknown(headers.get(USER_HEADER).and_then(|v| v.to_str().ok()))
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let session = Session::new(caller(&headers));
    let handle = Uuid::new_v4();

    let body = SessionCreated {
        handle,
        session_id: session.session_id().to_string(),
        user_name: session.user_name().to_string(),
    };
    state
        .sessions
        .write()
        .await
        .insert(handle, Arc::new(Mutex::new(session)));

    info!("Started session {} for {}", body.session_id, body.user_name);
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_session(State(state): State<Arc<AppState>>, Path(handle): Path<Uuid>) -> Response {
    let Some(session) = state.session(handle).await else {
        return session_not_found(handle);
    };
    let session = session.lock().await;

    let turns = visible_turns(session.turns(), state.settings.chat.transcript_limit);
    Json(TranscriptResponse {
        session_id: session.session_id().to_string(),
        user_name: session.user_name().to_string(),
        hidden_turns: session.turns().len() - turns.len(),
        turns: turns.to_vec(),
    })
    .into_response()
}

async fn end_session(State(state): State<Arc<AppState>>, Path(handle): Path<Uuid>) -> Response {
    match state.sessions.write().await.remove(&handle) {
        Some(_) => {
            info!("Ended session {}", handle);
            StatusCode::NO_CONTENT.into_response()
        }
        None => session_not_found(handle),
    }
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let Some(session) = state.session(handle).await else {
        return session_not_found(handle);
    };
    let Ok(mut session) = session.try_lock() else {
        return error_response(
            StatusCode::CONFLICT,
            "A question is already being answered in this session",
        );
    };

    match state.controller.submit(&mut session, &req.question).await {
        Ok(SubmitOutcome::Skipped) => StatusCode::NO_CONTENT.into_response(),
        Ok(SubmitOutcome::Answered(turn)) => Json(MessageResponse {
            turn,
            saved: true,
            warning: None,
        })
        .into_response(),
        Err(SubmitError::NotSaved { turn, source }) => Json(MessageResponse {
            turn,
            saved: false,
            warning: Some(format!("The answer was not saved to history: {}", source)),
        })
        .into_response(),
        Err(SubmitError::Completion(e @ PeonError::Timeout(_))) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, e.to_string())
        }
        Err(SubmitError::Completion(e)) if e.is_upstream() => {
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        Err(SubmitError::Completion(e)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn new_chat(State(state): State<Arc<AppState>>, Path(handle): Path<Uuid>) -> Response {
    let Some(session) = state.session(handle).await else {
        return session_not_found(handle);
    };
    let mut session = session.lock().await;
    state.controller.new_chat(&mut session);
    StatusCode::NO_CONTENT.into_response()
}

async fn history(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    history_for(&state, &caller(&headers)).await
}

/// History as seen by the user who started the session.
async fn session_history(State(state): State<Arc<AppState>>, Path(handle): Path<Uuid>) -> Response {
    let Some(session) = state.session(handle).await else {
        return session_not_found(handle);
    };
    let user_name = session.lock().await.user_name().to_string();
    history_for(&state, &user_name).await
}

async fn history_for(state: &AppState, user_name: &str) -> Response {
    match state.controller.view_history(user_name).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
