use serde::{Deserialize, Serialize};

pub mod format;
pub mod normalize;
pub mod query;
pub mod upstream;

pub use format::{render, CHARACTER_LIMIT};
pub use normalize::{normalize, Normalized, NO_RESPONSE_FINISH_REASON, NO_RESPONSE_MARKER};
pub use query::{validate, ResearchQuery, ResponseFormat, ValidationError, Violation};
pub use upstream::ChatCompletionsResponse;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Missing or unusable credentials/endpoint. Fatal at startup.
    #[error("not configured: {0}")]
    Configuration(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The upstream answered with a non-success HTTP status.
    #[error("upstream API error: {status} {status_text}\n{body}")]
    Upstream {
        status: u16,
        status_text: String,
        body: String,
    },
    /// No response at all (DNS, refused connection, timeout, ...).
    #[error("network error: {message}")]
    Network { message: String, timed_out: bool },
    #[error("{0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchMetadata {
    pub model: String,
    pub finish_reason: String,
    pub usage: ResearchUsage,
    pub citations: Vec<String>,
    /// Always `citations.len()`.
    pub total_sources: usize,
}

/// The rendered answer plus its canonical metadata.
///
/// This is the only shape handed back across the tool boundary; build it with
/// [`format::render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub text: String,
    pub metadata: ResearchMetadata,
}

/// Something that can answer a validated research query with a raw upstream payload.
///
/// Implementations own their credentials and endpoint; they are immutable after
/// construction and shared across concurrent calls.
#[async_trait::async_trait]
pub trait ResearchBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
    async fn research(&self, q: &ResearchQuery) -> Result<ChatCompletionsResponse>;
}
