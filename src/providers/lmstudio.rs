/*!
 * LM Studio client.
 *
 * LM Studio serves an OpenAI-compatible `POST /chat/completions` endpoint.
 * A whole request is sent as one call: the segments are joined with the
 * record-separator delimiter and the model is asked to answer with exactly
 * as many delimited pieces. Each attempt holds one concurrency slot; failed
 * attempts are retried with exponential backoff.
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::ClientConfig;
use crate::errors::ClientError;
use crate::language_utils::Language;
use crate::providers::ChatTransport;
use crate::translation::concurrency::{ConcurrencyLimiter, RetryPolicy};
use crate::translation::request::{
    LanguagePair, ParamOverrides, TranslationParams, TranslationRequest, TranslationResult,
    build_result, create_request, join_for_prompt, split_payload,
};
use crate::translation::segmenter::TextSegment;

/// Default LM Studio API root
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";

/// Default HTTP timeout per attempt
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system` or `user`
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

impl ChatCompletionRequest {
    /// Content of the user message, if any
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|message| message.role == "user")
            .map(|message| message.content.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

/// Response of `POST /chat/completions`; only the first choice is read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    /// Response carrying `content` as its first choice
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: Some(ChatChoiceMessage {
                    role: Some("assistant".to_string()),
                    content: Some(content.into()),
                }),
            }],
        }
    }

    /// Text of the first choice; missing or empty content is an invalid response
    pub fn into_content(self) -> Result<String, ClientError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ClientError::invalid_response("LM Studio returned an empty response payload."))
    }
}

/// System instruction for translating `count` segments across `pair`
pub fn system_prompt(pair: LanguagePair, count: usize) -> String {
    format!(
        "Translate strictly from {} to {}. Return exactly {} segments separated by U+241E (\u{241E}). \
         Do not add or remove segments. Preserve punctuation and newlines. No commentary.",
        pair.src.name(),
        pair.dst.name(),
        count
    )
}

/// Chat body for a validated translation request
pub fn build_chat_request(request: &TranslationRequest) -> ChatCompletionRequest {
    let params = request.params();
    ChatCompletionRequest {
        model: params.model.clone(),
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        messages: vec![
            ChatMessage::system(system_prompt(request.lang_pair(), request.len())),
            ChatMessage::user(join_for_prompt(request.segments())),
        ],
    }
}

/// Integer seconds from a `Retry-After` value; leading digits only
pub fn parse_retry_after(value: &str) -> Option<u64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Map a non-success status to its error, `None` for 2xx
pub fn classify_status(status: u16, retry_after: Option<&str>) -> Option<ClientError> {
    let retry_after_secs = retry_after.and_then(parse_retry_after);
    match status {
        200..=299 => None,
        401 => Some(ClientError::Unauthorized {
            message: "LM Studio rejected the API key.".to_string(),
        }),
        429 => Some(ClientError::RateLimit {
            message: "LM Studio rate limit exceeded.".to_string(),
            retry_after_secs,
        }),
        500..=u16::MAX => Some(ClientError::Server {
            status,
            message: format!("LM Studio returned {}.", status),
            retry_after_secs,
        }),
        _ => Some(ClientError::InvalidResponse {
            message: format!("LM Studio returned unexpected status {}.", status),
            status: Some(status),
            mismatch: None,
        }),
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Transport for the API rooted at `base_url`
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::invalid_response(format!("Invalid LM Studio URL {}: {}", base_url, e)))?;
        let endpoint = format!("{}/chat/completions", base.as_str().trim_end_matches('/'));

        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ClientError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(error) = classify_status(status, retry_after.as_deref()) {
            return Err(error);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::network(e.to_string()))?;

        serde_json::from_str::<ChatCompletionResponse>(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            debug!("Unparsable LM Studio response: {}", preview);
            ClientError::InvalidResponse {
                message: format!("Failed to parse LM Studio response: {}", e),
                status: Some(status),
                mismatch: None,
            }
        })
    }
}

/// LM Studio translation client
#[derive(Debug, Clone)]
pub struct LmStudio {
    transport: Arc<dyn ChatTransport>,
    limiter: ConcurrencyLimiter,
    retry: RetryPolicy,
}

impl LmStudio {
    /// Client over an arbitrary transport
    pub fn new(transport: Arc<dyn ChatTransport>, limiter: ConcurrencyLimiter, retry: RetryPolicy) -> Self {
        Self {
            transport,
            limiter,
            retry,
        }
    }

    /// HTTP client configured from the `client` config section
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(
            &config.endpoint,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::new(
            Arc::new(transport),
            ConcurrencyLimiter::new(config.concurrent_requests),
            RetryPolicy::new(config.retry_count, Duration::from_millis(config.retry_backoff_ms)),
        ))
    }

    /// The concurrency gate shared by every call on this client
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Translate every segment of `request` in one backend call
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, ClientError> {
        let chat = build_chat_request(request);
        let content = self.complete_with_retry(&chat).await?.into_content()?;

        let translated = split_payload(&content, request.len()).inspect_err(|e| {
            error!("LM Studio response for {} does not line up: {}", request.id(), e);
        })?;

        Ok(build_result(request, translated)?)
    }

    /// Probe the backend with a one-segment translation
    pub async fn test_connection(&self, params: &TranslationParams) -> Result<(), ClientError> {
        let request = create_request(
            "connection-test",
            vec![TextSegment::new("segment-0000", "Hello.")],
            LanguagePair::new(Language::En, Language::Ja),
            Some(ParamOverrides::from(params.clone())),
        )?;
        self.translate(&request).await.map(|_| ())
    }

    async fn complete_with_retry(
        &self,
        chat: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError> {
        let mut attempt: u32 = 0;

        loop {
            let outcome = {
                let _slot = self.limiter.acquire().await?;
                self.transport.complete(chat).await
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(e) if self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt, &e);
                    warn!(
                        "LM Studio request failed ({}): {} - retrying in {:?} (attempt {}/{})",
                        e.code(),
                        e,
                        delay,
                        attempt + 1,
                        self.retry.max_retries + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "LM Studio request failed ({}) after {} attempts: {}",
                        e.code(),
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}
