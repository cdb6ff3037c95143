use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

/// Thin client for an OpenAI-compatible chat-completions endpoint. Callers
/// are expected to fall back to static content when a request fails, so a
/// single bounded attempt is made per call.
#[derive(Clone)]
pub struct AiProvider {
    config: AiConfig,
    client: reqwest::Client,
}

impl AiProvider {
    pub fn new(config: AiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        let api_key = env_string("AI_API_KEY");
        let model = env_string("AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = normalize_endpoint(
            env_string("AI_API_ENDPOINT")
                .or_else(|| env_string("AI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        );
        let timeout = Duration::from_millis(env_u64("AI_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config: AiConfig {
                api_key,
                model,
                api_endpoint,
                timeout,
            },
            client,
        }
    }

    /// A provider with no credentials configured; every call fails fast and
    /// callers take their fallback path.
    pub fn disabled() -> Self {
        Self::new(AiConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, AiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(AiError::NotConfigured("AI_API_KEY"))?;

        let url = format!(
            "{}/chat/completions",
            self.config.api_endpoint.trim_end_matches('/')
        );
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::HttpStatus { status, body });
        }

        let bytes = resp.bytes().await?;
        match serde_json::from_slice(&bytes) {
            Ok(v) => Ok(v),
            Err(e) => {
                let body_str = String::from_utf8_lossy(&bytes);
                tracing::error!("Failed to parse AI response JSON: {}. Body: {}", e, body_str);
                Err(AiError::Json(e))
            }
        }
    }

    pub async fn complete_with_system(&self, system: &str, user: &str) -> Result<String, AiError> {
        let messages = [
            ChatMessage {
                role: "system".into(),
                content: system.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: user.into(),
            },
        ];
        let response = self.chat(&messages).await?;
        response
            .first_content()
            .map(|s| s.to_string())
            .ok_or(AiError::EmptyChoices)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalization_appends_v1_once() {
        assert_eq!(
            normalize_endpoint("https://api.example.com".into()),
            "https://api.example.com/v1"
        );
        assert_eq!(
            normalize_endpoint("https://api.example.com/v1/".into()),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn first_content_reads_leading_choice() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        }))
        .unwrap();
        assert_eq!(resp.first_content(), Some("hello"));
    }
}
