//! Completion providers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{CompletionError, Result};

/// Where a provider runs, which bounds how large prompts may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Self-hosted model with a small context window.
    Local,
    /// Hosted API with a large context window.
    Cloud,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Trait for text completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name used in logs and error hints.
    fn name(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Whether the provider is local or hosted.
    fn kind(&self) -> ProviderKind;

    /// Run one completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Which completion backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBackend {
    #[serde(rename = "openai")]
    OpenAI,
    #[default]
    Gemini,
    Ollama,
}

/// Configuration for the completion provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionProviderConfig {
    pub backend: CompletionBackend,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Build the configured provider.
pub fn from_config(config: &CompletionProviderConfig) -> Arc<dyn CompletionProvider> {
    match config.backend {
        CompletionBackend::OpenAI => {
            let mut provider = OpenAIChatProvider::new();
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        CompletionBackend::Gemini => {
            let mut provider = GeminiChatProvider::new();
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        CompletionBackend::Ollama => {
            let mut provider = OllamaChatProvider::new();
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
    }
}

async fn decode_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(CompletionError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    serde_json::from_str(&body)
        .map_err(|err| CompletionError::InvalidResponse(format!("undecodable body: {err}")))
}

/// OpenAI-compatible chat completions.
pub struct OpenAIChatProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAIChatProvider {
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for OpenAIChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OpenAIChatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloud
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let api_key = self.api_key.as_ref().ok_or(CompletionError::NotConfigured)?;

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        debug!("Requesting completion from {} ({})", self.name(), self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&json!({ "model": self.model, "messages": messages }))
            .send()
            .await?;
        let value = decode_body(response).await?;

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CompletionError::InvalidResponse("missing text in OpenAI response".to_string())
            })?
            .to_string();
        let usage = |field: &str| {
            value
                .get("usage")
                .and_then(|usage| usage.get(field))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32
        };

        Ok(CompletionResponse {
            content,
            prompt_tokens: usage("prompt_tokens"),
            completion_tokens: usage("completion_tokens"),
        })
    }
}

/// Google Gemini `generateContent`.
pub struct GeminiChatProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiChatProvider {
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for GeminiChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for GeminiChatProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloud
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let api_key = self.api_key.as_ref().ok_or(CompletionError::NotConfigured)?;

        let mut prompt = String::new();
        if let Some(system) = &request.system {
            prompt.push_str("[SYSTEM]\n");
            prompt.push_str(system.trim());
            prompt.push_str("\n\n");
        }
        prompt.push_str(&request.prompt);

        debug!("Requesting completion from {} ({})", self.name(), self.model);
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url.trim_end_matches('/'),
                self.model
            ))
            .header("x-goog-api-key", api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;
        let value = decode_body(response).await?;

        let content = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .and_then(|parts| parts.iter().find_map(|part| part.get("text")?.as_str()))
            .ok_or_else(|| {
                CompletionError::InvalidResponse("missing text in Gemini response".to_string())
            })?
            .to_string();
        let usage = |field: &str| {
            value
                .get("usageMetadata")
                .and_then(|usage| usage.get(field))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32
        };

        Ok(CompletionResponse {
            content,
            prompt_tokens: usage("promptTokenCount"),
            completion_tokens: usage("candidatesTokenCount"),
        })
    }
}

/// Local Ollama `/api/generate`.
pub struct OllamaChatProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaChatProvider {
    pub fn new() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for OllamaChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OllamaChatProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let mut payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
        });
        if let Some(system) = &request.system {
            payload["system"] = json!(system);
        }

        debug!("Requesting completion from {} ({})", self.name(), self.model);
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&payload)
            .send()
            .await?;
        let value = decode_body(response).await?;

        let content = value
            .get("response")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CompletionError::InvalidResponse("missing text in Ollama response".to_string())
            })?
            .to_string();
        let count = |field: &str| value.get(field).and_then(Value::as_u64).unwrap_or(0) as u32;

        Ok(CompletionResponse {
            content,
            prompt_tokens: count("prompt_eval_count"),
            completion_tokens: count("eval_count"),
        })
    }
}
