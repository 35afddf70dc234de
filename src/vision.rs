//! Chat-completions client for the vision model
//!
//! The response's `content` string is the only field this layer trusts;
//! every other part of the payload is checked before access. Failures carry
//! a diagnostic tag so the pipeline can record why it fell back without
//! matching on error strings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

const MAX_COMPLETION_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.2;

/// Why a model call produced no usable content.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call timed out after {0}ms")]
    Timeout(u64),

    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected model response shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("model returned no content")]
    NoContent,
}

impl ModelError {
    /// Diagnostic tag recorded in `fallback_reasons`.
    pub fn reason_tag(&self) -> &'static str {
        match self {
            ModelError::Timeout(_) => "vision_timeout",
            ModelError::Api { .. } | ModelError::Transport(_) => "model_request_failed",
            ModelError::Shape(_) => "incomplete_response",
            ModelError::NoContent => "no_content",
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlRef },
}

#[derive(Serialize)]
struct ImageUrlRef {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Thin client over the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ModelClient {
    /// Build a client from config; `None` when credentials are missing.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.has_model_credentials() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            base_url: config.model_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.vision_model.clone(),
        })
    }

    /// One vision call: text instructions plus an image reference (a URL or
    /// an inlined data URL).
    ///
    /// The whole request runs under `timeout_ms`; an elapsed timeout drops
    /// the in-flight request and returns `ModelError::Timeout`, which the
    /// caller treats as a normal degraded path.
    pub async fn chat_vision(
        &self,
        system: &str,
        user: &str,
        image_ref: &str,
        timeout_ms: u64,
        json_mode: bool,
    ) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: MessageContent::Text(system.to_string()),
                },
                Message {
                    role: "user".to_string(),
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: user.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrlRef {
                                url: image_ref.to_string(),
                            },
                        },
                    ]),
                },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
            response_format: json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let url = format!("{}/chat/completions", self.base_url);
        match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.send(&url, &request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(timeout_ms)),
        }
    }

    async fn send(&self, url: &str, request: &ChatRequest) -> Result<String, ModelError> {
        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                body: truncate(&text, 200).to_string(),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ModelError::NoContent)
    }
}

/// Truncate a string for error messages (Unicode-safe).
fn truncate(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_credentials() {
        assert!(ModelClient::from_config(&Config::default()).is_none());

        let config = Config {
            api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        assert!(ModelClient::from_config(&config).is_some());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = Config {
            api_key: Some("sk-test".to_string()),
            model_base_url: "https://models.example/v1/".to_string(),
            ..Config::default()
        };
        let client = ModelClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://models.example/v1");
    }

    #[test]
    fn test_reason_tags() {
        assert_eq!(ModelError::Timeout(1000).reason_tag(), "vision_timeout");
        assert_eq!(ModelError::NoContent.reason_tag(), "no_content");
        assert_eq!(
            ModelError::Api {
                status: 429,
                body: "rate limited".to_string()
            }
            .reason_tag(),
            "model_request_failed"
        );
    }

    #[test]
    fn test_vision_message_serializes_as_parts() {
        let message = Message {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "look".to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrlRef {
                        url: "https://img.example/p.jpg".to_string(),
                    },
                },
            ]),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "https://img.example/p.jpg"
        );
    }

    #[test]
    fn test_response_content_is_defensively_extracted() {
        let ok: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hello"}}]}"#).unwrap();
        assert_eq!(
            ok.choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .and_then(|m| m.content),
            Some("hello".to_string())
        );

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(empty.choices.is_empty());

        let no_message: ChatResponse = serde_json::from_str(r#"{"choices":[{}]}"#).unwrap();
        assert!(no_message.choices[0].message.is_none());

        let extra_fields: ChatResponse =
            serde_json::from_str(r#"{"id":"x","choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(extra_fields.choices[0]
            .message
            .as_ref()
            .and_then(|m| m.content.as_ref())
            .is_none());
    }

    #[test]
    fn test_truncate_is_unicode_safe() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("灯塔灯塔灯塔", 2), "灯塔");
    }
}
