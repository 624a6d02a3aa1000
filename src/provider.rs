//! Reasoning provider abstraction and implementations.
//!
//! The jury only needs one thing from a language model: send a prompt, get
//! text back. [`ReasoningProvider`] captures that contract; concrete
//! implementations:
//!
//! - **[`GeminiProvider`]**: Google `generateContent` API.
//! - **[`ChatCompletionsProvider`]**: OpenAI-style chat completions, used
//!   for DeepSeek and OpenRouter.
//! - **[`DisabledProvider`]**: always fails; the default when no provider
//!   is configured.
//!
//! Replies are free text that may be wrapped in markdown code fences.
//! [`parse_json_reply`] strips the fences and parses the rest as JSON; a
//! parse failure fails the whole request.
//!
//! # Deadlines
//!
//! Outbound calls never run unbounded: [`complete_with_deadline`] races the
//! provider against a timeout and a [`CancellationToken`]. There are no
//! automatic retries; failures surface to the caller.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderConfig;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEEPSEEK_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Something that turns a prompt into a text completion.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Short identifier used in logs (e.g. `"gemini:gemini-2.0-flash-lite"`).
    fn name(&self) -> String;

    /// Send one prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Instantiate the provider selected by `config.kind`.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn ReasoningProvider>> {
    match config.kind.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "gemini" => Ok(Box::new(GeminiProvider::new(config)?)),
        "deepseek" => Ok(Box::new(ChatCompletionsProvider::deepseek(config)?)),
        "openrouter" => Ok(Box::new(ChatCompletionsProvider::openrouter(config)?)),
        other => bail!("Unknown provider: {}", other),
    }
}

/// Run one completion bounded by `timeout` and `cancel`.
pub async fn complete_with_deadline(
    provider: &dyn ReasoningProvider,
    prompt: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    tokio::select! {
        _ = cancel.cancelled() => bail!("provider call cancelled"),
        outcome = tokio::time::timeout(timeout, provider.complete(prompt)) => match outcome {
            Ok(result) => result,
            Err(_) => bail!("provider call timed out after {}s", timeout.as_secs()),
        },
    }
}

/// Remove ```` ```json ```` openers and ```` ``` ```` closers, then trim.
pub fn strip_code_fences(text: &str) -> String {
    static FENCES: OnceLock<Regex> = OnceLock::new();
    let fences = FENCES.get_or_init(|| Regex::new(r"```json\n?|\n?```").expect("static regex"));
    fences.replace_all(text, "").trim().to_string()
}

/// Strip code fences and parse the remainder as `T`.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let clean = strip_code_fences(text);
    serde_json::from_str(&clean).with_context(|| "provider reply is not valid JSON")
}

fn read_api_key(config: &ProviderConfig, default_var: &str) -> Result<String> {
    let var = config.api_key_env.as_deref().unwrap_or(default_var);
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("{} environment variable not set", var),
    }
}

fn http_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

// ============ Disabled Provider ============

/// A provider that always returns errors.
pub struct DisabledProvider;

#[async_trait]
impl ReasoningProvider for DisabledProvider {
    fn name(&self) -> String {
        "disabled".to_string()
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("Reasoning provider is disabled")
    }
}

// ============ Gemini Provider ============

/// Google Gemini via `models/{model}:generateContent`.
///
/// Reads the key from `GEMINI_API_KEY` unless `provider.api_key_env` says otherwise.
pub struct GeminiProvider {
    client: reqwest::Client,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gemini-2.0-flash-lite".to_string()),
            api_key: read_api_key(config, "GEMINI_API_KEY")?,
        })
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ReasoningProvider for GeminiProvider {
    fn name(&self) -> String {
        format!("gemini:{}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Gemini error: {} {}", status.as_u16(), text);
        }

        let data: GeminiResponse = resp.json().await.context("Failed to parse Gemini response")?;
        let text: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            bail!("Gemini returned an empty response.");
        }
        Ok(text)
    }
}

// ============ Chat Completions Provider ============

/// OpenAI-compatible `chat/completions` endpoint (DeepSeek, OpenRouter).
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    label: &'static str,
    endpoint: String,
    model: String,
    api_key: String,
    extra_headers: Vec<(&'static str, String)>,
}

impl ChatCompletionsProvider {
    pub fn deepseek(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            label: "deepseek",
            endpoint: DEEPSEEK_ENDPOINT.to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "deepseek-chat".to_string()),
            api_key: read_api_key(config, "DEEPSEEK_API_KEY")?,
            extra_headers: Vec::new(),
        })
    }

    pub fn openrouter(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            label: "openrouter",
            endpoint: OPENROUTER_ENDPOINT.to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "openrouter/auto".to_string()),
            api_key: read_api_key(config, "OPENROUTER_API_KEY")?,
            extra_headers: vec![("X-Title", "VibeFlow".to_string())],
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageBody>,
}

#[derive(Deserialize)]
struct ChatMessageBody {
    content: Option<String>,
}

#[async_trait]
impl ReasoningProvider for ChatCompletionsProvider {
    fn name(&self) -> String {
        format!("{}:{}", self.label, self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut req = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        for (name, value) in &self.extra_headers {
            req = req.header(*name, value);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{} request failed", self.label))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("{} error: {} {}", self.label, status.as_u16(), text);
        }

        let data: ChatResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", self.label))?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            bail!("{} returned an empty response.", self.label);
        }
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct SlowProvider;

    #[async_trait]
    impl ReasoningProvider for SlowProvider {
        fn name(&self) -> String {
            "slow".to_string()
        }
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
    }

    #[test]
    fn test_parse_json_reply() {
        let v: Value = parse_json_reply("```json\n{\"summary\": \"ok\"}\n```").unwrap();
        assert_eq!(v["summary"], "ok");
        assert!(parse_json_reply::<Value>("Sure! Here is your JSON").is_err());
    }

    #[test]
    fn test_create_disabled_provider() {
        let provider = create_provider(&ProviderConfig::default()).unwrap();
        assert_eq!(provider.name(), "disabled");
    }

    #[test]
    fn test_missing_api_key() {
        let config = ProviderConfig {
            kind: "gemini".to_string(),
            api_key_env: Some("VIBEFLOW_TEST_KEY_THAT_IS_NOT_SET".to_string()),
            ..ProviderConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("VIBEFLOW_TEST_KEY_THAT_IS_NOT_SET"));
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let err = DisabledProvider.complete("hi").await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out() {
        let cancel = CancellationToken::new();
        let err = complete_with_deadline(&SlowProvider, "p", Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = complete_with_deadline(&SlowProvider, "p", Duration::from_secs(60), &cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
