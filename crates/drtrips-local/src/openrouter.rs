use crate::env;
use drtrips_core::{ChatCompletionsResponse, Error, ResearchBackend, ResearchQuery, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const MODEL_ENV: &str = "MODEL_USE";
pub const ENDPOINT_ENV: &str = "DRTRIPS_ENDPOINT";

pub const DEFAULT_MODEL: &str = "perplexity/sonar";
// Docs: https://openrouter.ai/docs/api-reference/chat-completion
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful research assistant that provides accurate and up-to-date information. \
Please provide comprehensive answers with relevant details and cite sources when possible.";

/// Immutable client configuration. Built once at startup and injected.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Read `OPENROUTER_API_KEY`, `MODEL_USE` and `DRTRIPS_ENDPOINT`.
    ///
    /// A missing key is reported here so the process can refuse to start.
    pub fn from_env() -> Result<Self> {
        let api_key = env(API_KEY_ENV).ok_or_else(|| {
            Error::Configuration(format!(
                "OpenRouter API key not configured. Please set {API_KEY_ENV} environment variable."
            ))
        })?;
        let mut cfg = Self::new(api_key);
        if let Some(m) = env(MODEL_ENV) {
            cfg.model = m;
        }
        if let Some(e) = env(ENDPOINT_ENV) {
            cfg.endpoint = e;
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl OpenRouterClient {
    pub fn new(client: reqwest::Client, config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "OpenRouter API key not configured. Please set {API_KEY_ENV} environment variable."
            )));
        }
        if config.model.trim().is_empty() {
            return Err(Error::Configuration("model identifier is empty".to_string()));
        }
        url::Url::parse(&config.endpoint).map_err(|e| {
            Error::Configuration(format!("invalid endpoint {:?}: {e}", config.endpoint))
        })?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn request_for(&self, q: &ResearchQuery) -> ChatCompletionsRequest {
        ChatCompletionsRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: q.system_prompt().unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: q.query.clone(),
                },
            ],
        }
    }

    /// One POST, no retries. The transport's default timeout applies.
    pub async fn chat_completions(
        &self,
        req: &ChatCompletionsRequest,
    ) -> Result<ChatCompletionsResponse> {
        let t0 = Instant::now();
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| Error::Network {
                message: e.to_string(),
                timed_out: e.is_timeout(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::debug!("chat.completions HTTP {status}: error body unreadable: {e}");
                    String::new()
                }
            };
            log::debug!(
                "chat.completions HTTP {status} after {}ms",
                t0.elapsed().as_millis()
            );
            return Err(Error::Upstream {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }

        let parsed = resp
            .json::<ChatCompletionsResponse>()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    Error::Unknown(format!("invalid upstream response: {e}"))
                } else {
                    Error::Network {
                        message: e.to_string(),
                        timed_out: e.is_timeout(),
                    }
                }
            })?;
        log::debug!(
            "chat.completions ok model={} choices={} in {}ms",
            parsed.model.as_deref().unwrap_or("?"),
            parsed.choices.as_ref().map_or(0, Vec::len),
            t0.elapsed().as_millis()
        );
        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl ResearchBackend for OpenRouterClient {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn research(&self, q: &ResearchQuery) -> Result<ChatCompletionsResponse> {
        self.chat_completions(&self.request_for(q)).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionsRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}
