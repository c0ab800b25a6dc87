//! The core models for managing a stateful chat with an LLM.
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::ChatError;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation. The session ID is filled in by
/// the `Transcript` the turn is appended to.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Turn {
    pub fn new(role: Role, content: &str) -> Self {
        Turn {
            role,
            content: content.to_string(),
            timestamp: Some(Utc::now()),
            session_id: None,
        }
    }

    pub fn system(content: &str) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// ISO-8601 capture time, empty when the turn was never stamped.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }
}

/// The ordered, append-only record of a single session's turns.
///
/// A transcript holds at most one system turn and it is always the
/// first one. Turns are never removed or reordered.
pub struct Transcript {
    session_id: String,
    turns: Vec<Turn>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::new_with_session_id(&Uuid::new_v4().to_string())
    }

    pub fn new_with_session_id(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            turns: Vec::new(),
        }
    }

    /// Start a transcript with a system instruction as its first turn.
    pub fn new_with_system(session_id: &str, system_message: &str) -> Result<Self, ChatError> {
        let mut transcript = Self::new_with_session_id(session_id);
        transcript.append(Turn::system(system_message))?;
        Ok(transcript)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn append(&mut self, mut turn: Turn) -> Result<(), ChatError> {
        match turn.role {
            Role::System if !self.turns.is_empty() => {
                return Err(ChatError::Validation(String::from(
                    "A system turn can only start a conversation",
                )));
            }
            Role::User | Role::Assistant if turn.content.trim().is_empty() => {
                return Err(ChatError::Validation(format!(
                    "{} message is empty",
                    turn.role.as_str()
                )));
            }
            _ => {}
        }

        match &turn.session_id {
            Some(id) if *id != self.session_id => {
                return Err(ChatError::Validation(format!(
                    "Turn belongs to session {} not {}",
                    id, self.session_id
                )));
            }
            Some(_) => {}
            None => turn.session_id = Some(self.session_id.clone()),
        }

        self.turns.push(turn);
        Ok(())
    }

    pub fn all(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Turns to show to the user. System turns are for the model only.
    pub fn visible(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.role != Role::System)
    }

    pub fn system(&self) -> Option<&Turn> {
        self.turns.first().filter(|t| t.role == Role::System)
    }

    /// Build the sequence to send for a completion. A `system_prompt`
    /// supplied here replaces the stored system turn for this call
    /// only and is not kept in the transcript.
    pub fn for_completion(&self, system_prompt: Option<&str>) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.turns.len() + 1);
        match system_prompt {
            Some(prompt) => {
                let mut synthetic = Turn::system(prompt);
                synthetic.session_id = Some(self.session_id.clone());
                turns.push(synthetic);
                turns.extend(self.visible().cloned());
            }
            None => turns.extend(self.turns.iter().cloned()),
        }
        turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
