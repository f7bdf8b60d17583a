//! AI adapter: the text-generation collaborator (`prompt -> text | None`) and its providers.
//! Providers never surface errors to callers; failures are logged and become `None`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text-generation capability used by the haiku generator and the translator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`; `None` when nothing usable came back.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Option<String>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynGenerator = Arc<dyn TextGenerator>;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider (Chat Completions API).
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("haiku-news/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building openai http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            temperature: 0.8,
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Option<String> {
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens,
            n: 1,
        };

        let resp = match self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "ai", error = ?e, "openai request failed");
                return None;
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(target: "ai", status = %resp.status(), "openai returned error status");
            return None;
        }

        let body: Resp = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "ai", error = ?e, "openai response did not decode");
                return None;
            }
        };

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            tracing::warn!(target: "ai", "openai returned no content");
            None
        } else {
            Some(content)
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Fixed-output provider for local runs (`AI_TEST_MODE=mock`) and tests.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("An old silent pond\nA frog jumps into the pond\nSplash! Silence again")
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Option<String> {
        Some(self.fixed.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Returns `None` always; used when generation is switched off.
pub struct DisabledClient;

#[async_trait]
impl TextGenerator for DisabledClient {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Option<String> {
        None
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}
