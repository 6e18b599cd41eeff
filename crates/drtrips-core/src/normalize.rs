//! Reconcile the upstream response variants into one canonical answer.

use crate::upstream::{ChatCompletionsResponse, Usage};
use crate::{ResearchMetadata, ResearchUsage};

pub const NO_RESPONSE_MARKER: &str = "❌ No response from Perplexity API";
pub const NO_RESPONSE_FINISH_REASON: &str = "no_response";

const UNKNOWN: &str = "unknown";

/// Canonical answer before rendering. `answer` is `None` when the upstream returned no
/// choices at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub answer: Option<String>,
    pub metadata: ResearchMetadata,
}

/// Pick the citation list for a response.
///
/// Two API variants exist and never meaningfully coexist:
/// - Perplexity native: a top-level `citations` array (used verbatim, even when empty);
/// - OpenRouter: `url_citation` annotations on the first choice's message.
///
/// The first present source wins; the two are never merged.
pub fn reconcile_citations(resp: &ChatCompletionsResponse) -> Vec<String> {
    if let Some(citations) = &resp.citations {
        return citations.clone();
    }
    let annotations = resp
        .choices
        .as_deref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.annotations.as_deref());
    match annotations {
        Some(anns) => anns
            .iter()
            .filter(|a| a.is_url_citation())
            .filter_map(|a| a.url_citation.as_ref().and_then(|u| u.url.clone()))
            .collect(),
        None => Vec::new(),
    }
}

pub fn reconcile_usage(usage: Option<&Usage>) -> ResearchUsage {
    let Some(u) = usage else {
        return ResearchUsage::default();
    };
    let input_tokens = u.prompt_tokens.unwrap_or(0);
    let output_tokens = u.completion_tokens.unwrap_or(0);
    ResearchUsage {
        input_tokens,
        output_tokens,
        total_tokens: u
            .total_tokens
            .unwrap_or_else(|| input_tokens.saturating_add(output_tokens)),
    }
}

pub fn normalize(resp: &ChatCompletionsResponse) -> Normalized {
    let model = resp.model.clone().unwrap_or_else(|| UNKNOWN.to_string());
    let usage = reconcile_usage(resp.usage.as_ref());

    let Some(choice) = resp.choices.as_deref().and_then(|c| c.first()) else {
        return Normalized {
            answer: None,
            metadata: ResearchMetadata {
                model,
                finish_reason: NO_RESPONSE_FINISH_REASON.to_string(),
                usage,
                citations: Vec::new(),
                total_sources: 0,
            },
        };
    };

    let citations = reconcile_citations(resp);
    Normalized {
        answer: Some(choice.message.content.clone().unwrap_or_default()),
        metadata: ResearchMetadata {
            model,
            finish_reason: choice
                .finish_reason
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            usage,
            total_sources: citations.len(),
            citations,
        },
    }
}
