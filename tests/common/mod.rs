/*!
 * Common test utilities for the yakusu test suite
 */

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use yakusu::language_utils::Language;
use yakusu::providers::LmStudio;
use yakusu::providers::mock::MockTransport;
use yakusu::translation::concurrency::{ConcurrencyLimiter, RetryPolicy};
use yakusu::translation::request::LanguagePair;
use yakusu::translation::segmenter::{TextSegment, segment_id};

/// English to Japanese
pub fn en_ja() -> LanguagePair {
    LanguagePair::new(Language::En, Language::Ja)
}

/// Japanese to English
pub fn ja_en() -> LanguagePair {
    LanguagePair::new(Language::Ja, Language::En)
}

/// Segments with sequential ids for the given texts
pub fn segments(texts: &[&str]) -> Vec<TextSegment> {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| TextSegment::new(segment_id(index), *text))
        .collect()
}

/// Retry policy with a negligible backoff so tests stay fast
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1))
}

/// Client over a mock transport
pub fn mock_client(transport: Arc<MockTransport>, concurrency: usize, max_retries: u32) -> LmStudio {
    LmStudio::new(transport, ConcurrencyLimiter::new(concurrency), fast_retry(max_retries))
}

/// OpenAI-style chat completion body carrying `content`
pub fn chat_completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "lmstudio",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

/// Initialize test logging once; repeated calls are ignored
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// wiremock responder that "translates" by tagging every delimited segment
/// of the user message, so any request shape gets a well-formed answer
pub struct TaggingResponder {
    pub tag: &'static str,
}

impl wiremock::Respond for TaggingResponder {
    fn respond(&self, request: &wiremock::Request) -> wiremock::ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return wiremock::ResponseTemplate::new(400),
        };
        let user = body["messages"]
            .as_array()
            .and_then(|messages| messages.iter().find(|m| m["role"] == "user"))
            .and_then(|m| m["content"].as_str())
            .unwrap_or_default();
        let translated: Vec<String> = user
            .split('\u{241E}')
            .map(|segment| format!("{} {}", self.tag, segment))
            .collect();
        wiremock::ResponseTemplate::new(200).set_body_json(chat_completion_body(&translated.join("\u{241E}")))
    }
}
