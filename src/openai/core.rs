use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::ai::chat::{CompletionGateway, CompletionOptions, Role, Turn};
use crate::core::ChatError;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message::new(turn.role, &turn.content)
    }
}

// {
//     "id": "chatcmpl-123",
//     "object": "chat.completion",
//     "choices": [{
//         "index": 0,
//         "message": {"role": "assistant", "content": "Hello!"},
//         "finish_reason": "stop"
//     }]
// }
#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

pub fn completion_payload(messages: &[Message], options: &CompletionOptions) -> Value {
    let mut payload = json!({
        "model": options.model,
        "messages": messages,
    });
    if let Some(max_tokens) = options.max_output_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    payload
}

/// Pull the most useful message out of an error body. OpenAI
/// compatible APIs use `{"error": {"message": ...}}` but proxies and
/// local servers sometimes return plain text.
fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

pub async fn completion(
    messages: &[Message],
    options: &CompletionOptions,
    api_hostname: &str,
    api_key: &str,
) -> Result<String, ChatError> {
    let payload = completion_payload(messages, options);
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 10))
        .json(&payload)
        .send()
        .await
        .map_err(|e| ChatError::Completion(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ChatError::Completion(e.to_string()))?;
    if !status.is_success() {
        return Err(ChatError::Completion(format!(
            "{} ({})",
            upstream_error_message(&text),
            status
        )));
    }

    let resp: CompletionResponse = serde_json::from_str(&text)
        .inspect_err(|e| tracing::error!("Parsing completion failed for {}\nError:{}", text, e))
        .map_err(|e| ChatError::Completion(format!("Unexpected completion response: {}", e)))?;

    let reply = resp
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();
    if reply.is_empty() {
        return Err(ChatError::Completion(String::from(
            "No message received in completion response",
        )));
    }

    Ok(reply)
}

/// Completion gateway for any OpenAI compatible chat completions API.
pub struct OpenAiGateway {
    api_hostname: String,
    api_key: String,
}

impl OpenAiGateway {
    pub fn new(api_hostname: &str, api_key: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(
        &self,
        turns: &[Turn],
        options: &CompletionOptions,
    ) -> Result<String, ChatError> {
        let messages: Vec<Message> = turns.iter().map(Message::from).collect();
        tracing::debug!(
            "Requesting completion from {} with {} message(s)",
            options.model,
            messages.len()
        );
        completion(&messages, options, &self.api_hostname, &self.api_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_new() {
        let msg = Message::new(Role::User, "Hello world");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"Hello world"}"#
        );

        let msg = Message::new(Role::Assistant, "I can help!");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"assistant","content":"I can help!"}"#
        );
    }

    #[test]
    fn test_message_from_turn_drops_metadata() {
        let mut turn = Turn::system("You are terse.");
        turn.session_id = Some("s1".to_string());
        let msg = Message::from(&turn);
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"system","content":"You are terse."}"#
        );
    }

    #[test]
    fn test_completion_payload() {
        let messages = vec![
            Message::new(Role::System, "Be brief."),
            Message::new(Role::User, "hi"),
        ];
        let payload = completion_payload(&messages, &CompletionOptions::new("gpt-4"));
        assert_eq!(payload["model"], "gpt-4");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "hi");
        assert!(payload.get("max_tokens").is_none());

        let options = CompletionOptions {
            model: String::from("gpt-4"),
            max_output_tokens: Some(64),
        };
        let payload = completion_payload(&messages, &options);
        assert_eq!(payload["max_tokens"], 64);
    }

    #[test]
    fn test_upstream_error_message() {
        assert_eq!(
            upstream_error_message(r#"{"error": {"message": "Incorrect API key provided"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(
            upstream_error_message(r#"{"error": "model not loaded"}"#),
            "model not loaded"
        );
        assert_eq!(upstream_error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_gateway_returns_trimmed_reply() {
        let mut server = mockito::Server::new_async().await;

        let response_body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "\n  hi there \n"
                },
                "finish_reason": "stop"
            }]
        }"#;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "You are terse."},
                    {"role": "user", "content": "hello"}
                ],
                "max_tokens": 32
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create_async()
            .await;

        let gateway = OpenAiGateway::new(&server.url(), "test-key");
        let turns = vec![Turn::system("You are terse."), Turn::user("hello")];
        let options = CompletionOptions {
            model: String::from("gpt-4"),
            max_output_tokens: Some(32),
        };
        let reply = gateway.complete(&turns, &options).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn test_gateway_surfaces_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}}"#)
            .create_async()
            .await;

        let gateway = OpenAiGateway::new(&server.url(), "test-key");
        let err = gateway
            .complete(&[Turn::user("hello")], &CompletionOptions::new("gpt-4"))
            .await
            .unwrap_err();

        match err {
            ChatError::Completion(msg) => {
                assert!(msg.contains("You exceeded your current quota"));
                assert!(msg.contains("429"));
            }
            other => panic!("Expected completion error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gateway_rejects_missing_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]}"#)
            .create_async()
            .await;

        let gateway = OpenAiGateway::new(&server.url(), "test-key");
        let result = gateway
            .complete(&[Turn::user("hello")], &CompletionOptions::new("gpt-4"))
            .await;
        assert!(matches!(result, Err(ChatError::Completion(_))));
    }

    #[tokio::test]
    async fn test_gateway_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let gateway = OpenAiGateway::new(&server.url(), "test-key");
        let result = gateway
            .complete(&[Turn::user("hello")], &CompletionOptions::new("gpt-4"))
            .await;
        assert!(matches!(result, Err(ChatError::Completion(_))));
    }

    #[tokio::test]
    async fn test_gateway_transport_failure() {
        // Nothing listens on port 9 on the loopback interface
        let gateway = OpenAiGateway::new("http://127.0.0.1:9", "test-key");
        let result = gateway
            .complete(&[Turn::user("hello")], &CompletionOptions::new("gpt-4"))
            .await;
        assert!(matches!(result, Err(ChatError::Completion(_))));
    }
}
