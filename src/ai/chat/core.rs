use serde::Serialize;
use uuid::Uuid;

use super::gateway::{CompletionOptions, SharedCompletionGateway};
use super::models::{Transcript, Turn};
use super::persist::PersistenceLogger;
use crate::core::{ChatError, Notice};

/// The core abstraction around a single chat session: takes the
/// user's text, asks the LLM for a reply and mirrors the exchange to
/// the sheet log.
///
/// A session is idle between calls to `submit` and awaiting a
/// completion while one is running. `submit` takes `&mut self` so
/// only one submission per session can be in flight.
///
/// Use `ChatBuilder` to construct a valid `Chat`.
pub struct Chat {
    gateway: SharedCompletionGateway,
    options: CompletionOptions,
    logger: Option<PersistenceLogger>,
    system_prompt: Option<String>,
    transcript: Transcript,
}

/// The outcome of a successful submission. Logging problems do not
/// fail the submission, they show up in `notices`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Submission {
    pub reply: String,
    pub notices: Vec<Notice>,
}

impl Chat {
    pub fn session_id(&self) -> &str {
        self.transcript.session_id()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Snapshot of the turns to render.
    pub fn visible(&self) -> Vec<Turn> {
        self.transcript.visible().cloned().collect()
    }

    /// Runs the next turn in the chat.
    ///
    /// - Empty input is rejected before anything changes.
    /// - If the completion fails the user's turn stays in the
    ///   transcript, no reply is added and nothing is logged.
    /// - If logging fails the reply still stands and a warning is
    ///   returned with it.
    pub async fn submit(&mut self, text: &str) -> Result<Submission, ChatError> {
        let before = self.transcript.len();
        self.transcript.append(Turn::user(text))?;

        let turns = self.transcript.for_completion(self.system_prompt.as_deref());
        let reply = self
            .gateway
            .complete(&turns, &self.options)
            .await
            .and_then(|reply| {
                if reply.trim().is_empty() {
                    Err(ChatError::Completion(String::from("Received an empty reply")))
                } else {
                    Ok(reply)
                }
            })
            .inspect_err(|e| {
                tracing::error!("Completion failed for session {}: {}", self.session_id(), e)
            })?;

        self.transcript.append(Turn::assistant(&reply))?;

        let new_turns: Vec<Turn> = self.transcript.all().skip(before).cloned().collect();
        let mut notices = Vec::new();
        if let Some(logger) = &self.logger
            && let Err(e) = logger.log(&self.transcript, &new_turns).await
        {
            tracing::warn!("Sheet logging failed for session {}: {}", self.session_id(), e);
            notices.push(Notice::from(&e));
        }

        Ok(Submission { reply, notices })
    }
}

pub struct ChatBuilder {
    gateway: SharedCompletionGateway,
    options: CompletionOptions,
    logger: Option<PersistenceLogger>,
    session_id: Option<String>,
    system_message: Option<String>,
    system_prompt: Option<String>,
}

impl ChatBuilder {
    pub fn new(gateway: SharedCompletionGateway, options: CompletionOptions) -> Self {
        Self {
            gateway,
            options,
            logger: None,
            session_id: None,
            system_message: None,
            system_prompt: None,
        }
    }

    pub fn build(self) -> Result<Chat, ChatError> {
        let session_id = self
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let transcript = match &self.system_message {
            Some(msg) => Transcript::new_with_system(&session_id, msg)?,
            None => Transcript::new_with_session_id(&session_id),
        };

        Ok(Chat {
            gateway: self.gateway,
            options: self.options,
            logger: self.logger,
            system_prompt: self.system_prompt,
            transcript,
        })
    }

    pub fn session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Seeds the transcript with a system turn.
    pub fn system_message(mut self, message: &str) -> Self {
        self.system_message = Some(message.to_string());
        self
    }

    /// An instruction sent ahead of every completion without being
    /// stored in the transcript. Takes precedence over
    /// `system_message` when both are set.
    pub fn system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    pub fn logger(mut self, logger: PersistenceLogger) -> Self {
        self.logger = Some(logger);
        self
    }
}
