//! Router for the chat API

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tokio::sync::Mutex;

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::core::{ChatError, Notice};

type SharedState = Arc<RwLock<AppState>>;

/// Get the visible transcript of a single chat session by ID
async fn chat_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state
        .read()
        .expect("Unable to read share state")
        .session(&id);

    let Some(chat) = chat else {
        return Ok((
            StatusCode::NOT_FOUND,
            format!("Chat session {} not found", id),
        )
            .into_response());
    };

    let transcript = chat.lock().await.visible();
    Ok(axum::Json(public::ChatTranscriptResponse {
        session_id: id,
        transcript,
    })
    .into_response())
}

/// Get a list of all chat sessions held by this process
async fn chat_list(
    State(state): State<SharedState>,
) -> Result<axum::Json<public::ChatSessionsResponse>, ApiError> {
    let chats: Vec<(String, crate::api::SharedChat)> = {
        let shared_state = state.read().expect("Unable to read share state");
        shared_state
            .sessions
            .iter()
            .map(|(id, chat)| (id.clone(), Arc::clone(chat)))
            .collect()
    };

    let mut sessions = Vec::with_capacity(chats.len());
    for (id, chat) in chats {
        let turns = chat.lock().await.visible().len();
        sessions.push(public::ChatSession { id, turns });
    }
    sessions.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(axum::Json(public::ChatSessionsResponse { sessions }))
}

/// Submit a message to a chat session, creating the session if it
/// doesn't exist yet, and respond with the updated transcript.
async fn chat_handler(
    State(state): State<SharedState>,
    axum::Json(payload): axum::Json<public::ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Lookup and registration happen under one write lock so
    // concurrent requests for a new ID share the same session
    let (chat, is_new) = {
        let mut shared_state = state.write().expect("Unable to write share state");
        let existing = payload
            .session_id
            .as_deref()
            .and_then(|id| shared_state.session(id));
        match existing {
            Some(chat) => (chat, false),
            None => {
                let chat = shared_state
                    .factory
                    .build(payload.session_id.as_deref())?;
                let id = chat.session_id().to_string();
                (shared_state.register(&id, Arc::new(Mutex::new(chat))), true)
            }
        }
    };

    let mut session = chat.lock().await;
    let session_id = session.session_id().to_string();
    let result = session.submit(&payload.message).await;

    // A rejected message doesn't start a session
    if is_new
        && matches!(result, Err(ChatError::Validation(_)))
        && session.visible().is_empty()
    {
        state
            .write()
            .expect("Unable to write share state")
            .discard_if_unused(&session_id, &chat);
    }

    let (status, notices) = match result {
        Ok(submission) => (StatusCode::OK, submission.notices),
        Err(e @ ChatError::Completion(_)) => (StatusCode::BAD_GATEWAY, vec![Notice::from(&e)]),
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(
        "Chat session {} responded {} with {} notice(s)",
        session_id,
        status,
        notices.len()
    );

    Ok((
        status,
        axum::Json(public::ChatResponse {
            session_id,
            transcript: session.visible(),
            notices,
        }),
    )
        .into_response())
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(chat_handler))
        .route("/sessions", get(chat_list))
        .route("/{id}", get(chat_session))
}
