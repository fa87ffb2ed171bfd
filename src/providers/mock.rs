/*!
 * Mock transport implementations for testing.
 *
 * This module provides a scripted `ChatTransport` that simulates different
 * backend behaviors without a server:
 * - `MockTransport::working()` - Always succeeds, prefixing every segment
 * - `MockTransport::failing(..)` - Always fails with the chosen error
 * - `MockBehavior::FailThenWork` - Fails a fixed number of times, then succeeds
 *
 * It also records what it was sent and how many calls overlapped, so tests
 * can assert on retries and the concurrency ceiling.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ClientError;
use crate::providers::ChatTransport;
use crate::providers::lmstudio::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translation::request::SEGMENT_DELIMITER;

/// Failure a mock exchange produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Transport timeout
    Timeout,
    /// HTTP 429 with an optional retry-after hint
    RateLimit { retry_after_secs: Option<u64> },
    /// HTTP 503
    Server,
    /// HTTP 401
    Unauthorized,
}

impl MockFailure {
    fn to_error(self) -> ClientError {
        match self {
            Self::Timeout => ClientError::network("operation timed out"),
            Self::RateLimit { retry_after_secs } => ClientError::RateLimit {
                message: "Simulated rate limit".to_string(),
                retry_after_secs,
            },
            Self::Server => ClientError::Server {
                status: 503,
                message: "Simulated server failure".to_string(),
                retry_after_secs: None,
            },
            Self::Unauthorized => ClientError::Unauthorized {
                message: "Simulated bad API key".to_string(),
            },
        }
    }
}

/// Behavior mode for the mock transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Always succeeds with every segment translated
    Working,
    /// Fails the first `failures` calls, then behaves as `Working`
    FailThenWork { failures: usize, failure: MockFailure },
    /// Always fails
    Failing(MockFailure),
    /// Returns an empty message content
    Empty,
    /// Returns one segment fewer than it was sent
    DropLastSegment,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Scripted chat transport
#[derive(Debug)]
pub struct MockTransport {
    behavior: MockBehavior,
    request_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<ChatCompletionRequest>>,
    custom_response: Option<fn(&str) -> String>,
}

impl MockTransport {
    /// Create a new mock transport with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing(failure: MockFailure) -> Self {
        Self::new(MockBehavior::Failing(failure))
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Translate each segment with `generator` instead of the default prefix
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Calls received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Most recent request body
    pub fn last_request(&self) -> Option<ChatCompletionRequest> {
        self.requests.lock().last().cloned()
    }

    /// Every request body, in arrival order
    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().clone()
    }

    fn translate_segment(&self, text: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(text),
            None => format!("[TRANSLATED] {}", text),
        }
    }

    fn translated_payload(&self, request: &ChatCompletionRequest, drop_last: bool) -> String {
        let mut segments: Vec<String> = request
            .user_content()
            .unwrap_or_default()
            .split(SEGMENT_DELIMITER)
            .map(|segment| self.translate_segment(segment))
            .collect();
        if drop_last {
            segments.pop();
        }

        let mut delimiter = [0u8; 4];
        segments.join(SEGMENT_DELIMITER.encode_utf8(&mut delimiter))
    }

    async fn respond(&self, request: &ChatCompletionRequest, count: usize) -> Result<ChatCompletionResponse, ClientError> {
        match self.behavior {
            MockBehavior::Working => Ok(ChatCompletionResponse::with_content(
                self.translated_payload(request, false),
            )),
            MockBehavior::FailThenWork { failures, failure } => {
                if count < failures {
                    Err(failure.to_error())
                } else {
                    Ok(ChatCompletionResponse::with_content(
                        self.translated_payload(request, false),
                    ))
                }
            }
            MockBehavior::Failing(failure) => Err(failure.to_error()),
            MockBehavior::Empty => Ok(ChatCompletionResponse::with_content("")),
            MockBehavior::DropLastSegment => Ok(ChatCompletionResponse::with_content(
                self.translated_payload(request, true),
            )),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(ChatCompletionResponse::with_content(
                    self.translated_payload(request, false),
                ))
            }
        }
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ClientError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = self.respond(request, count).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
