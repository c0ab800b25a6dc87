//! Test utilities for integration tests
#![allow(dead_code)]
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request};

use sheetchat::ai::chat::{CompletionGateway, CompletionOptions, TabularLog, Turn};
use sheetchat::api::AppState;
use sheetchat::api::app;
use sheetchat::core::{ChatError, ChatFactory};

/// Replies with queued responses, then echoes the last message.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    pub requests: Mutex<Vec<Vec<Turn>>>,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        let replies = replies
            .into_iter()
            .map(|r| {
                r.map(String::from)
                    .map_err(|e| ChatError::Completion(e.to_string()))
            })
            .collect();
        Arc::new(Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    /// Echoes every message after waiting for `delay`.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(
        &self,
        turns: &[Turn],
        _options: &CompletionOptions,
    ) -> Result<String, ChatError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().unwrap().push(turns.to_vec());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            let last = turns.last().map(|t| t.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        })
    }
}

/// Keeps appended rows in memory or fails every append.
#[derive(Default)]
pub struct MemoryLog {
    pub rows: Mutex<Vec<Vec<String>>>,
    pub fail: bool,
}

impl MemoryLog {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            fail: true,
        })
    }
}

#[async_trait]
impl TabularLog for MemoryLog {
    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<(), ChatError> {
        if self.fail {
            return Err(ChatError::Logging(String::from(
                "The caller does not have permission",
            )));
        }
        self.rows.lock().unwrap().extend(rows);
        Ok(())
    }
}

/// Creates a test application router backed by the given completion
/// gateway and sheet.
pub fn test_app_with(gateway: Arc<ScriptedGateway>, log: Arc<MemoryLog>) -> Router {
    let factory = ChatFactory::new(
        gateway,
        log,
        CompletionOptions::new("gpt-4"),
        "You are a helpful assistant.",
    );
    app(Arc::new(RwLock::new(AppState::new(factory))))
}

/// Creates a test application router that echoes every message.
pub fn test_app() -> Router {
    test_app_with(
        ScriptedGateway::new(vec![]),
        Arc::new(MemoryLog::default()),
    )
}

pub fn post_chat(session_id: Option<&str>, message: &str) -> Request<Body> {
    let mut payload = serde_json::json!({ "message": message });
    if let Some(id) = session_id {
        payload["session_id"] = serde_json::json!(id);
    }
    Request::builder()
        .uri("/api/chat")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}
