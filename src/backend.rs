use anyhow::{anyhow, Context};
use async_trait::async_trait;
use awful_aj::{api::ask, config::AwfulJadeConfig, template::ChatTemplate};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::api_types::{Content, GenerateContentRequest, GenerateContentResponse, Part};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Failure of a single backend call, classified for the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// HTTP 429 / RESOURCE_EXHAUSTED; worth retrying after a pause.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Unknown model or route; retrying cannot help.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body.trim());
        if status == StatusCode::TOO_MANY_REQUESTS.as_u16() || body.contains("RESOURCE_EXHAUSTED") {
            BackendError::RateLimited(message)
        } else if status == StatusCode::NOT_FOUND.as_u16() {
            BackendError::NotFound(message)
        } else {
            BackendError::Other(message)
        }
    }

    /// Classify an opaque error message by the markers clients embed in it.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if message.contains("429") || message.contains("RESOURCE_EXHAUSTED") || lower.contains("too many requests") {
            BackendError::RateLimited(message)
        } else if message.contains("404") || lower.contains("not found") {
            BackendError::NotFound(message)
        } else {
            BackendError::Other(message)
        }
    }

    #[cfg(test)]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, BackendError::RateLimited(_))
    }
}

/// A text-generation service that turns a prompt into raw text.
// Backends are driven from the single pipeline task, so futures need not be Send.
#[async_trait(?Send)]
pub trait Backend {
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Google Generative Language API (API key auth).
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: &str, model: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait(?Send)]
impl Backend for GeminiBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Other(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            debug!("Gemini error - status={}, body_length={}", status, text.len());
            return Err(BackendError::from_status(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Other(format!("decoding response: {}", e)))?;

        parsed
            .text()
            .ok_or_else(|| BackendError::Other("response contained no text".to_string()))
    }
}

/// Any OpenAI-compatible endpoint configured through an awful_aj config file.
pub struct AwfulJadeBackend {
    cfg: AwfulJadeConfig,
    template: ChatTemplate,
    model: String,
}

/// Config file location: explicit path > AJ_CONFIG > <AJ_CONFIG_DIR or awful_aj dir>/config.yaml.
pub fn resolve_awful_config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("AJ_CONFIG") {
        return Ok(PathBuf::from(p));
    }
    let base_dir = if let Ok(dir) = std::env::var("AJ_CONFIG_DIR") {
        PathBuf::from(dir)
    } else {
        awful_aj::config_dir().map_err(|e| anyhow!(e.to_string()))?
    };
    Ok(base_dir.join("config.yaml"))
}

impl AwfulJadeBackend {
    pub async fn load(config_path: &Path, template_name: &str) -> anyhow::Result<Self> {
        if !config_path.exists() {
            return Err(anyhow!(
                "awful_aj config not found at {}\n\
                 Use --config to specify a config file, or set AJ_CONFIG environment variable.\n\
                 Example config.yaml:\n\
                 api_key: \"YOUR_KEY\"\napi_base: \"http://localhost:5001/v1\"\nmodel: \"qwen3_30b_a3\"\n",
                config_path.display()
            ));
        }
        let cfg = awful_aj::config::load_config(
            config_path
                .to_str()
                .ok_or_else(|| anyhow!("invalid config path"))?,
        )
        .map_err(|e| anyhow!(e.to_string()))?;
        let template = awful_aj::template::load_template(template_name)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;
        let model = cfg.model.clone();
        Ok(Self { cfg, template, model })
    }
}

#[async_trait(?Send)]
impl Backend for AwfulJadeBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        ask(&self.cfg, prompt.to_string(), &self.template, None, None, false)
            .await
            .map_err(|e| BackendError::classify(e.to_string()))
    }
}
