/*!
 * Translation backend clients.
 *
 * This module contains the client for the LM Studio chat-completions API
 * and the transport seam it is built on:
 * - `lmstudio`: request shaping, retries and the HTTP transport
 * - `mock`: scripted transport used by tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ClientError;

pub mod lmstudio;
pub mod mock;

pub use lmstudio::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, HttpTransport, LmStudio};

/// One chat-completion exchange with the backend
///
/// Implementations perform a single attempt and map every failure into a
/// `ClientError`; retrying and concurrency limits are the caller's concern.
#[async_trait]
pub trait ChatTransport: Send + Sync + Debug {
    /// Send `request` and return the decoded response
    ///
    /// # Arguments
    /// * `request` - The chat-completion body to send
    ///
    /// # Returns
    /// * `Result<ChatCompletionResponse, ClientError>` - The decoded body or a classified failure
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ClientError>;
}
