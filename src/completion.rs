use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CompletionConfig;
use crate::error::CaptionError;
use crate::prompt::PromptPair;

const PROVIDER_NAME: &str = "chat-completions";

/// Per-request sampling parameters sent with the completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub n: u32,
    pub max_tokens: u32,
}

impl SamplingConfig {
    /// Draws a temperature uniformly from the configured range; everything
    /// else is fixed by config.
    pub fn draw<R: Rng + ?Sized>(config: &CompletionConfig, rng: &mut R) -> Self {
        let (low, high) = ordered(config.temperature_min, config.temperature_max);
        let temperature = if high > low {
            rng.random_range(low..=high)
        } else {
            low
        };

        Self {
            model: config.model.clone(),
            temperature,
            top_p: config.top_p,
            n: 1,
            max_tokens: config.max_tokens,
        }
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw text of the first choice. Any transport failure, timeout or
    /// non-success status is [`CaptionError::BackendUnavailable`].
    async fn complete(
        &self,
        prompt: &PromptPair,
        sampling: &SamplingConfig,
    ) -> Result<String, CaptionError>;
}

/// OpenAI-compatible `/chat/completions` client (DeepSeek by default).
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl ChatCompletionClient {
    pub fn new(endpoint: Url, api_key: Option<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("caption-forge/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10).min(request_timeout))
            .timeout(request_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            request_timeout,
        })
    }

    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid completion endpoint: {}", config.endpoint))?;
        let api_key = env::var("DEEPSEEK_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let client = Self::new(
            endpoint,
            api_key,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )?;
        client.initialize(&config.model);
        Ok(client)
    }

    fn initialize(&self, model: &str) {
        if self.api_key.is_none() {
            tracing::warn!("DEEPSEEK_API_KEY is not set; completion requests will be sent unauthenticated");
        }
        info!(
            "✅ Completion backend ready (model: {}, endpoint: {}, timeout: {:?})",
            model, self.endpoint, self.request_timeout
        );
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn complete(
        &self,
        prompt: &PromptPair,
        sampling: &SamplingConfig,
    ) -> Result<String, CaptionError> {
        let body = ChatRequest {
            model: &sampling.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            n: sampling.n,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!(
            temperature = sampling.temperature,
            max_tokens = sampling.max_tokens,
            "Sending completion request"
        );

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                CaptionError::backend(format!(
                    "completion request timed out after {:?}",
                    self.request_timeout
                ))
            } else {
                CaptionError::backend(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ChatErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|error| error.message)
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(CaptionError::backend(format!(
                "{status} from completion backend: {detail}"
            )));
        }

        let payload: ChatResponse = response.json().await.map_err(|err| {
            CaptionError::backend(format!("unable to parse completion response: {err}"))
        })?;

        extract_text(payload)
            .ok_or_else(|| CaptionError::backend("completion response contained no choices"))
    }
}

fn extract_text(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    n: u32,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize, Default)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChatErrorResponse {
    error: Option<ChatErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: Option<String>,
}
