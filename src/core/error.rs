use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Every failure a chat session can run into. The variant decides
/// how far the failure is allowed to travel: configuration errors
/// stop the process, the rest are handled per submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("Could not log to sheet: {0}")]
    Logging(String),
}

impl ChatError {
    pub fn severity(&self) -> Severity {
        match self {
            ChatError::Logging(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A message for the person using the chat, separate from the
/// transcript itself.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl From<&ChatError> for Notice {
    fn from(err: &ChatError) -> Self {
        Notice {
            severity: err.severity(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_logging_errors_are_advisory() {
        assert_eq!(
            ChatError::Logging("quota".into()).severity(),
            Severity::Warning
        );
        assert_eq!(
            ChatError::Completion("quota".into()).severity(),
            Severity::Error
        );
        assert_eq!(
            ChatError::Validation("empty".into()).severity(),
            Severity::Error
        );
    }

    #[test]
    fn test_notice_serialization() {
        let notice = Notice::from(&ChatError::Logging("403 Forbidden".into()));
        assert_eq!(
            serde_json::to_string(&notice).unwrap(),
            r#"{"severity":"warning","message":"Could not log to sheet: 403 Forbidden"}"#
        );
    }
}
