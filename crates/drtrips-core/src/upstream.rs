//! Wire shapes returned by the chat-completions endpoint.
//!
//! Only the fields the normalizer reads are modelled, each optional: OpenRouter and
//! Perplexity disagree on which ones they send, and anything else is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionsResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    /// Perplexity-native citation list.
    #[serde(default)]
    pub citations: Option<Vec<String>>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    /// OpenRouter attaches citations here instead of the top-level list.
    #[serde(default)]
    pub annotations: Option<Vec<Annotation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub url_citation: Option<UrlCitation>,
}

impl Annotation {
    pub const URL_CITATION: &'static str = "url_citation";

    pub fn is_url_citation(&self) -> bool {
        self.kind.as_deref() == Some(Self::URL_CITATION)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlCitation {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}
