//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::ai::chat::Turn;
use crate::core::Notice;

#[derive(Deserialize)]
pub struct ChatRequest {
    // A new session is started when missing or unknown
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub transcript: Vec<Turn>,
    pub notices: Vec<Notice>,
}

#[derive(Serialize)]
pub struct ChatTranscriptResponse {
    pub session_id: String,
    pub transcript: Vec<Turn>,
}

#[derive(Serialize, Clone)]
pub struct ChatSession {
    pub id: String,
    pub turns: usize,
}

#[derive(Serialize)]
pub struct ChatSessionsResponse {
    pub sessions: Vec<ChatSession>,
}
