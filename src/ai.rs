use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Response;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::LlmError;

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
    ClaudeCode,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    match name {
        // Claude Code provider (uses the `claude` CLI, no API key needed)
        "claude-sonnet" | "sonnet" => Ok(ModelSpec {
            provider: ProviderKind::ClaudeCode,
            model_id: "claude-sonnet-4-5-20250929".to_string(),
            short_name: "claude-sonnet".to_string(),
        }),
        "claude-haiku" | "haiku" => Ok(ModelSpec {
            provider: ProviderKind::ClaudeCode,
            model_id: "claude-haiku-4-5-20251001".to_string(),
            short_name: "claude-haiku".to_string(),
        }),
        // Direct Anthropic API (requires ANTHROPIC_API_KEY)
        "api-sonnet" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-sonnet-4-5-20250929".to_string(),
            short_name: "api-sonnet".to_string(),
        }),
        "api-haiku" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-haiku-4-5-20251001".to_string(),
            short_name: "api-haiku".to_string(),
        }),
        // OpenAI or any OpenAI-compatible gateway (requires OPENAI_API_KEY)
        "gpt-4o-mini" => Ok(ModelSpec {
            provider: ProviderKind::OpenAI,
            model_id: "gpt-4o-mini".to_string(),
            short_name: "gpt-4o-mini".to_string(),
        }),
        "gpt-4o" => Ok(ModelSpec {
            provider: ProviderKind::OpenAI,
            model_id: "gpt-4o".to_string(),
            short_name: "gpt-4o".to_string(),
        }),
        "o3" => Ok(ModelSpec {
            provider: ProviderKind::OpenAI,
            model_id: "o3".to_string(),
            short_name: "o3".to_string(),
        }),
        _ => Err(anyhow!(
            "Unknown model '{}'. Available: claude-sonnet (default), claude-haiku, \
             api-sonnet, api-haiku, gpt-4o-mini, gpt-4o, o3",
            name
        )),
    }
}

pub fn create_provider(spec: &ModelSpec, base_url: Option<&str>) -> Result<Box<dyn AIProvider>> {
    match spec.provider {
        ProviderKind::ClaudeCode => {
            let provider = ClaudeCodeProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
        ProviderKind::Anthropic => {
            let provider = AnthropicProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
        ProviderKind::OpenAI => {
            let provider = OpenAIProvider::new(spec.model_id.clone(), base_url)?;
            Ok(Box::new(provider))
        }
    }
}

fn http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .context("Failed to build HTTP client")
}

/// Longest server-requested backoff honoured before retrying.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(600);

fn bounded_backoff(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_RETRY_AFTER.as_secs_f64())).ok()
}

/// Reads `retry-after` (seconds) or `retry-after-ms` from a 429 response, capped at ten minutes.
pub fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
    };
    if let Some(secs) = header("retry-after") {
        return bounded_backoff(secs);
    }
    header("retry-after-ms").and_then(|ms| bounded_backoff(ms / 1000.0))
}

fn check_status(response: Response, provider: &str) -> Result<Response, LlmError> {
    let status = response.status();
    if status.as_u16() == 429 {
        let retry_after = retry_after_hint(response.headers());
        warn!(provider, ?retry_after, "LLM provider rate limited the request");
        return Err(LlmError::RateLimited { retry_after });
    }
    if !status.is_success() {
        let message = response.text().unwrap_or_default();
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set. Set it with: export ANTHROPIC_API_KEY=your-key-here")?;
        Ok(Self {
            api_key,
            model_id,
            client: http_client()?,
        })
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request = AnthropicRequest {
            model: &self.model_id,
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model_id, "Sending prompt to Anthropic");
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()?;

        let api_response: AnthropicResponse = check_status(response, "anthropic")?.json()?;

        api_response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Claude Code provider (shells out to `claude` CLI) ---

#[derive(Debug)]
pub struct ClaudeCodeProvider {
    model_id: String,
}

impl ClaudeCodeProvider {
    pub fn new(model_id: String) -> Result<Self> {
        // Verify claude CLI is available
        std::process::Command::new("claude")
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .context("'claude' CLI not found. Install it or use api-sonnet/gpt-4o instead.")?;
        Ok(Self { model_id })
    }
}

impl AIProvider for ClaudeCodeProvider {
    fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        let output = std::process::Command::new("claude")
            .arg("-p")
            .arg(prompt)
            .arg("--model")
            .arg(&self.model_id)
            .output()
            .map_err(|e| LlmError::Unavailable(format!("Failed to run 'claude' CLI: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmError::Unavailable(format!("claude CLI failed: {}", stderr)));
        }

        let response = String::from_utf8_lossy(&output.stdout).into_owned();
        if response.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }

        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<OpenAIMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    /// `base_url` points at any OpenAI-compatible gateway; defaults to OpenAI.
    pub fn new(model_id: String, base_url: Option<&str>) -> Result<Self> {
        let api_key = match base_url {
            Some(_) => env::var("OPENAI_API_KEY").unwrap_or_default(),
            None => env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY environment variable not set. Set it with: export OPENAI_API_KEY=your-key-here")?,
        };
        let base = base_url.unwrap_or(OPENAI_API_URL).trim_end_matches('/');
        Ok(Self {
            api_key,
            model_id,
            endpoint: format!("{}/chat/completions", base),
            client: http_client()?,
        })
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request = OpenAIRequest {
            model: &self.model_id,
            max_tokens,
            temperature: 0.4,
            messages: vec![OpenAIMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model_id, endpoint = %self.endpoint, "Sending prompt to OpenAI-compatible API");
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        let response = builder.json(&request).send()?;

        let api_response: OpenAIResponse = check_status(response, "openai")?.json()?;

        api_response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_resolve_model_claude_code() {
        let spec = resolve_model("claude-sonnet").unwrap();
        assert_eq!(spec.model_id, "claude-sonnet-4-5-20250929");
        assert!(matches!(spec.provider, ProviderKind::ClaudeCode));

        let spec = resolve_model("sonnet").unwrap();
        assert_eq!(spec.short_name, "claude-sonnet");

        let spec = resolve_model("haiku").unwrap();
        assert!(matches!(spec.provider, ProviderKind::ClaudeCode));
    }

    #[test]
    fn test_resolve_model_anthropic_api() {
        let spec = resolve_model("api-sonnet").unwrap();
        assert!(matches!(spec.provider, ProviderKind::Anthropic));
    }

    #[test]
    fn test_resolve_model_openai() {
        let spec = resolve_model("gpt-4o-mini").unwrap();
        assert_eq!(spec.model_id, "gpt-4o-mini");
        assert!(matches!(spec.provider, ProviderKind::OpenAI));

        let spec = resolve_model("o3").unwrap();
        assert!(matches!(spec.provider, ProviderKind::OpenAI));
    }

    #[test]
    fn test_resolve_model_unknown() {
        assert!(resolve_model("gpt-3").is_err());
    }

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("12"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_retry_after_milliseconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after-ms", HeaderValue::from_static("1500"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1e30"));
        assert_eq!(retry_after_hint(&headers), Some(MAX_RETRY_AFTER));

        headers.insert("retry-after", HeaderValue::from_static("inf"));
        assert_eq!(retry_after_hint(&headers), Some(MAX_RETRY_AFTER));

        headers.insert("retry-after", HeaderValue::from_static("NaN"));
        assert_eq!(retry_after_hint(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("-5"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::ZERO));
    }

    #[test]
    fn test_retry_after_missing() {
        assert_eq!(retry_after_hint(&HeaderMap::new()), None);
    }

    #[test]
    fn test_openai_gateway_does_not_require_key() {
        let provider = OpenAIProvider::new(
            "tensorzero::function_name::answer".to_string(),
            Some("http://localhost:3000/openai/v1/"),
        )
        .unwrap();
        assert_eq!(provider.endpoint, "http://localhost:3000/openai/v1/chat/completions");
        assert_eq!(provider.model_name(), "tensorzero::function_name::answer");
    }
}
