//! Chat completion client for an OpenAI-compatible endpoint.

use async_trait::async_trait;
use cfo_core::config::CompletionConfig;
use cfo_core::{CfoError, CfoResult};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Returned when the model answers without any content.
pub const EMPTY_REPLY: &str = "Sorry, I could not produce an answer. Please try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompletionRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionMessage {
    pub role: CompletionRole,
    pub content: String,
}

impl CompletionMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: CompletionRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: CompletionRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: CompletionRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single-shot, non-streaming text completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[CompletionMessage]) -> CfoResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [CompletionMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionsResponse {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string())
    }
}

pub struct OpenAiClient {
    config: CompletionConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: CompletionConfig) -> CfoResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CfoError::Config(format!("failed to build completion client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[CompletionMessage]) -> CfoResult<String> {
        if self.config.api_key.is_empty() {
            return Err(CfoError::CompletionFailure(
                "completion API key is not configured".to_string(),
            ));
        }

        let request = ChatCompletionsRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| CfoError::CompletionFailure(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "Completion endpoint returned an error");
            return Err(CfoError::CompletionFailure(format!(
                "completion API error ({status}): {body}"
            )));
        }

        let parsed: ChatCompletionsResponse = response
            .json()
            .await
            .map_err(|e| CfoError::CompletionFailure(format!("malformed response: {e}")))?;

        debug!(model = %self.config.model, messages = messages.len(), "Completion received");
        Ok(parsed.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(api_key: &str) -> CompletionConfig {
        CompletionConfig {
            base_url: "http://127.0.0.1:1/v1".to_string(),
            api_key: api_key.to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![
            CompletionMessage::system("persona"),
            CompletionMessage::user("hello"),
        ];
        let body = serde_json::to_value(ChatCompletionsRequest {
            model: "gpt-4o",
            messages: &messages,
            max_tokens: 2000,
            temperature: 0.5,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_first_choice_content_is_the_reply() {
        let parsed: ChatCompletionsResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "Margins look healthy."}}]
        }))
        .unwrap();
        assert_eq!(parsed.into_text(), "Margins look healthy.");
    }

    #[test]
    fn test_missing_content_yields_apology() {
        let parsed: ChatCompletionsResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(parsed.into_text(), EMPTY_REPLY);

        let parsed: ChatCompletionsResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert_eq!(parsed.into_text(), EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_a_completion_failure() {
        let client = OpenAiClient::new(config("")).unwrap();
        let err = client
            .complete(&[CompletionMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CfoError::CompletionFailure(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_completion_failure() {
        let client = OpenAiClient::new(config("sk-test")).unwrap();
        let err = client
            .complete(&[CompletionMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CfoError::CompletionFailure(_)));
    }
}
