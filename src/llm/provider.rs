//! Backend trait: common interface for completion services.

use async_trait::async_trait;
use thiserror::Error;

/// Sampling parameters for a completion call.
#[derive(Debug, Clone, Default)]
pub struct LlmParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub stop: Option<Vec<String>>,
}

/// One request to the backend: persona instructions plus the conversation
/// content to react to.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub instructions: String,
    pub content: String,
    pub params: LlmParams,
}

/// Every failure mode is treated by callers as "no response available";
/// the variants only matter for logs.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Common interface for completion backends.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Single non-streaming completion.
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError>;

    /// Backend identifier (e.g. "openai").
    fn id(&self) -> &str;
}
