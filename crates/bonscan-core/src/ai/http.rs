//! HTTP provider implementation
//!
//! Every known provider speaks the same request shape, POST
//! `{model, messages:[{role,content}], temperature}`, but answers in one
//! of two shapes: the chat-completion form
//! `{"choices":[{"message":{"content":...}}]}` or the raw form
//! `{"response":...}`. Both are accepted via an untagged enum; no shape is
//! ever assumed without decoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::parsing::{parse_classification_response, parse_extraction_response};
use super::types::{ExtractedItem, KeywordSuggestion};
use super::ProviderBackend;

/// A text-completion provider reached over HTTP
pub struct HttpProvider {
    name: String,
    http_client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    timeout: Duration,
}

impl Clone for HttpProvider {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            http_client: self.http_client.clone(),
            url: self.url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

impl HttpProvider {
    pub fn new(name: &str, url: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            http_client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            temperature: 0.1,
            timeout: Duration::from_secs(45),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make a completion request and return the text content
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content.to_string(),
                },
            ],
            temperature: self.temperature,
        };

        let mut req_builder = self.http_client.post(&self.url).json(&request);
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidData(format!(
                "provider {} error {}: {}",
                self.name, status, body
            )));
        }

        let reply: CompletionReply = response.json().await?;
        match reply {
            CompletionReply::Chat { choices } => choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| {
                    Error::InvalidData(format!("provider {} returned no choices", self.name))
                }),
            CompletionReply::Raw { response } => Ok(response),
        }
    }
}

/// Completion request (shared wire shape across providers)
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// The two response shapes providers are known to return
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionReply {
    /// Chat-completion shape
    Chat { choices: Vec<ChatChoice> },
    /// Provider-specific raw shape
    Raw { response: String },
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl ProviderBackend for HttpProvider {
    async fn extract_items(
        &self,
        system_prompt: &str,
        receipt_text: &str,
    ) -> Result<Vec<ExtractedItem>> {
        let response = self.complete(system_prompt, receipt_text).await?;
        debug!(provider = self.name.as_str(), response = response.as_str(), "extraction response");
        Ok(parse_extraction_response(&response))
    }

    async fn classify_products(
        &self,
        system_prompt: &str,
        text: &str,
    ) -> Result<Vec<KeywordSuggestion>> {
        let response = self.complete(system_prompt, text).await?;
        debug!(provider = self.name.as_str(), response = response.as_str(), "classification response");
        Ok(parse_classification_response(&response))
    }

    async fn health_check(&self) -> bool {
        // Reachability only; a 405 on GET still means someone is listening.
        self.http_client.get(&self.url).send().await.is_ok()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.url
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_new_trims_trailing_slash() {
        let provider = HttpProvider::new("local", "http://localhost:11434/v1/chat/completions/", "llama3.2");
        assert_eq!(provider.host(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(provider.model(), "llama3.2");
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_builder_methods() {
        let provider = HttpProvider::new("x", "http://h", "m")
            .with_api_key("sk-test")
            .with_temperature(0.5)
            .with_timeout(Duration::from_secs(60));
        assert_eq!(provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(provider.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest {
            model: "llama3.2".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            temperature: 0.1,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        let temp = json["temperature"].as_f64().unwrap();
        assert!((temp - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_chat_shape_deserialization() {
        let json = r#"{
            "id": "chatcmpl-123",
            "model": "llama3.2",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "table here"},
                "finish_reason": "stop"
            }]
        }"#;

        let reply: CompletionReply = serde_json::from_str(json).unwrap();
        match reply {
            CompletionReply::Chat { choices } => {
                assert_eq!(choices[0].message.content, "table here");
            }
            CompletionReply::Raw { .. } => panic!("expected chat shape"),
        }
    }

    #[test]
    fn test_raw_shape_deserialization() {
        let json = r#"{"model": "llama3.2", "response": "raw text", "done": true}"#;

        let reply: CompletionReply = serde_json::from_str(json).unwrap();
        match reply {
            CompletionReply::Raw { response } => assert_eq!(response, "raw text"),
            CompletionReply::Chat { .. } => panic!("expected raw shape"),
        }
    }
}
