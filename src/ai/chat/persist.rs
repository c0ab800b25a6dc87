//! Mirrors chat turns to an external append-only table (a Google
//! Sheet in production). The table is write-only from our side.
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use super::models::{Role, Transcript, Turn};
use crate::core::ChatError;

/// Which turns get written after each exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogPolicy {
    /// Only the turns produced by the latest submission
    #[default]
    AppendNewOnly,
    /// The entire visible history, every time. Each exchange
    /// duplicates every row written before it.
    AppendFullHistory,
}

impl FromStr for LogPolicy {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new-only" | "new_only" => Ok(LogPolicy::AppendNewOnly),
            "full-history" | "full_history" => Ok(LogPolicy::AppendFullHistory),
            other => Err(ChatError::Configuration(format!(
                "Unknown log policy {}, expected new-only or full-history",
                other
            ))),
        }
    }
}

/// The shape of a logged row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowFormat {
    /// `[timestamp, session_id, role, content]` for every turn
    #[default]
    Turn,
    /// `[user_content, assistant_content]` for every exchange
    Exchange,
}

impl FromStr for RowFormat {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "turn" => Ok(RowFormat::Turn),
            "exchange" => Ok(RowFormat::Exchange),
            other => Err(ChatError::Configuration(format!(
                "Unknown row format {}, expected turn or exchange",
                other
            ))),
        }
    }
}

/// An append-only table addressed at configuration time. Rows are
/// written in order and never updated, deleted or read back.
#[async_trait]
pub trait TabularLog: Send + Sync {
    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<(), ChatError>;
}

pub type SharedTabularLog = Arc<dyn TabularLog>;

pub struct PersistenceLogger {
    backend: SharedTabularLog,
    policy: LogPolicy,
    format: RowFormat,
}

impl PersistenceLogger {
    pub fn new(backend: SharedTabularLog, policy: LogPolicy, format: RowFormat) -> Self {
        Self {
            backend,
            policy,
            format,
        }
    }

    /// Project turns into rows according to the policy and format.
    /// `new_turns` are the turns added by the latest submission.
    pub fn rows(&self, transcript: &Transcript, new_turns: &[Turn]) -> Vec<Vec<String>> {
        match self.policy {
            LogPolicy::AppendNewOnly => self.project(new_turns.iter()),
            LogPolicy::AppendFullHistory => self.project(transcript.visible()),
        }
    }

    fn project<'a>(&self, turns: impl Iterator<Item = &'a Turn>) -> Vec<Vec<String>> {
        let turns = turns.filter(|t| t.role != Role::System);
        match self.format {
            RowFormat::Turn => turns.map(turn_row).collect(),
            RowFormat::Exchange => exchange_rows(turns),
        }
    }

    /// Append the rows for the latest submission. Returns how many
    /// rows were written.
    pub async fn log(&self, transcript: &Transcript, new_turns: &[Turn]) -> Result<usize, ChatError> {
        let rows = self.rows(transcript, new_turns);
        if rows.is_empty() {
            return Ok(0);
        }
        let count = rows.len();
        self.backend.append_rows(rows).await?;
        tracing::debug!(
            "Logged {} row(s) for session {}",
            count,
            transcript.session_id()
        );
        Ok(count)
    }
}

fn turn_row(turn: &Turn) -> Vec<String> {
    vec![
        turn.timestamp_rfc3339(),
        turn.session_id.clone().unwrap_or_default(),
        turn.role.as_str().to_string(),
        turn.content.clone(),
    ]
}

// A user turn with no reply (the completion failed) is superseded by
// the next user turn.
fn exchange_rows<'a>(turns: impl Iterator<Item = &'a Turn>) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut pending_user: Option<&str> = None;
    for turn in turns {
        match turn.role {
            Role::User => pending_user = Some(turn.content.as_str()),
            Role::Assistant => {
                let user = pending_user.take().unwrap_or_default();
                rows.push(vec![user.to_string(), turn.content.clone()]);
            }
            Role::System => {}
        }
    }
    rows
}
