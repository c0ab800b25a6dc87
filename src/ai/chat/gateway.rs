use std::sync::Arc;

use async_trait::async_trait;

use super::models::Turn;
use crate::core::ChatError;

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOptions {
    /// Which backend model to target
    pub model: String,
    /// Upper bound on the length of the generated reply
    pub max_output_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            max_output_tokens: None,
        }
    }
}

/// Adapter to an external text generation service. Implementations
/// send the turns in order as a single request and return the text
/// of the top reply with surrounding whitespace trimmed. Any failure
/// from the service is a `ChatError::Completion`.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(
        &self,
        turns: &[Turn],
        options: &CompletionOptions,
    ) -> Result<String, ChatError>;
}

pub type SharedCompletionGateway = Arc<dyn CompletionGateway>;
