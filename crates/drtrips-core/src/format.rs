//! Render a canonical answer as markdown or JSON, then apply the output ceiling.

use crate::normalize::{Normalized, NO_RESPONSE_MARKER};
use crate::query::ResponseFormat;
use crate::{ResearchMetadata, ResearchResult, ResearchUsage};
use serde::Serialize;

/// Maximum characters returned to the caller (Unicode scalar values, not bytes).
pub const CHARACTER_LIMIT: usize = 25_000;

#[derive(Serialize)]
struct JsonAnswer<'a> {
    answer: &'a str,
    citations: &'a [String],
    model: &'a str,
    finish_reason: &'a str,
    usage: &'a ResearchUsage,
    total_sources: usize,
}

fn render_json(answer: &str, meta: &ResearchMetadata) -> String {
    let body = JsonAnswer {
        answer,
        citations: &meta.citations,
        model: &meta.model,
        finish_reason: &meta.finish_reason,
        usage: &meta.usage,
        total_sources: meta.total_sources,
    };
    // Only strings, integers and slices: serialization cannot fail.
    serde_json::to_string_pretty(&body).unwrap_or_default()
}

fn render_markdown(answer: &str, meta: &ResearchMetadata, query: &str) -> String {
    let mut out = String::with_capacity(answer.len() + 256);
    out.push_str(answer);
    if !meta.citations.is_empty() {
        out.push_str("\n\n📚 **Citations:**\n");
        for (i, c) in meta.citations.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", i + 1, c));
        }
    }
    out.push_str("\n\n---\n");
    out.push_str(&format!("🔍 **Query:** {query}\n"));
    out.push_str(&format!("🤖 **Model:** {}\n", meta.model));
    out.push_str(&format!("✅ **Finish Reason:** {}", meta.finish_reason));
    out
}

pub fn truncation_notice(format: ResponseFormat, original_chars: usize, limit: usize) -> String {
    match format {
        ResponseFormat::Json => format!(
            "\n\n[Response truncated from {original_chars} to {limit} characters. Please refine your query to get more focused results.]"
        ),
        ResponseFormat::Markdown => format!(
            "\n\n⚠️ **Response Truncated**\nOriginal length: {original_chars} characters\nTruncated to: {limit} characters\n\nPlease refine your query or use more specific search terms to get more focused results."
        ),
    }
}

/// Cut `content` so that content plus the truncation notice is exactly `limit` chars.
///
/// The notice only depends on the pre-truncation length and the limit, so its size is
/// known before slicing. Text at or under the limit is returned untouched.
pub fn apply_limit(content: String, format: ResponseFormat, limit: usize) -> String {
    let original = content.chars().count();
    if original <= limit {
        return content;
    }
    let notice = truncation_notice(format, original, limit);
    let notice_chars = notice.chars().count();
    if notice_chars >= limit {
        // Degenerate ceiling: the notice alone does not fit. Never exceed the limit.
        return notice.chars().take(limit).collect();
    }
    let mut out: String = content.chars().take(limit - notice_chars).collect();
    out.push_str(&notice);
    out
}

/// Render a normalized answer for `query` in the requested format.
///
/// A "no response" answer is passed through as the fixed marker in either format.
pub fn render(normalized: &Normalized, query: &str, format: ResponseFormat) -> ResearchResult {
    let text = match &normalized.answer {
        None => NO_RESPONSE_MARKER.to_string(),
        Some(answer) => {
            let rendered = match format {
                ResponseFormat::Json => render_json(answer, &normalized.metadata),
                ResponseFormat::Markdown => render_markdown(answer, &normalized.metadata, query),
            };
            apply_limit(rendered, format, CHARACTER_LIMIT)
        }
    };
    ResearchResult {
        text,
        metadata: normalized.metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use proptest::prelude::*;
    use serde_json::json;

    fn normalized(v: serde_json::Value) -> Normalized {
        normalize(&serde_json::from_value(v).unwrap())
    }

    #[test]
    fn markdown_without_citations_has_only_the_footer() {
        let n = normalized(json!({
            "model": "perplexity/sonar",
            "choices": [{ "message": { "content": "4." }, "finish_reason": "stop" }]
        }));
        let r = render(&n, "What is 2+2?", ResponseFormat::Markdown);
        assert_eq!(
            r.text,
            "4.\n\n---\n🔍 **Query:** What is 2+2?\n🤖 **Model:** perplexity/sonar\n✅ **Finish Reason:** stop"
        );
        assert!(!r.text.contains("Citations"));
    }

    #[test]
    fn markdown_lists_citations_in_order() {
        let n = normalized(json!({
            "model": "perplexity/sonar",
            "choices": [{ "message": { "content": "answer" }, "finish_reason": "stop" }],
            "citations": ["http://a.com", "http://b.com"]
        }));
        let r = render(&n, "q?", ResponseFormat::Markdown);
        assert!(r
            .text
            .contains("📚 **Citations:**\n[1] http://a.com\n[2] http://b.com\n"));
        assert_eq!(r.metadata.total_sources, 2);
        let a = r.text.find("[1] http://a.com").unwrap();
        let b = r.text.find("[2] http://b.com").unwrap();
        let footer = r.text.find("---").unwrap();
        assert!(a < b && b < footer);
    }

    #[test]
    fn json_round_trips_with_consistent_sources() {
        let n = normalized(json!({
            "model": "perplexity/sonar",
            "choices": [{ "message": { "content": "answer" }, "finish_reason": "stop" }],
            "citations": ["http://a.com"],
            "usage": { "prompt_tokens": 3, "completion_tokens": 4 }
        }));
        let r = render(&n, "q?", ResponseFormat::Json);
        let v: serde_json::Value = serde_json::from_str(&r.text).unwrap();
        assert_eq!(v["answer"], "answer");
        assert_eq!(
            v["citations"].as_array().unwrap().len() as u64,
            v["total_sources"].as_u64().unwrap()
        );
        assert_eq!(v["usage"]["total_tokens"], 7);
        assert_eq!(v["finish_reason"], "stop");
        // Pretty-printed, no trailing decoration.
        assert!(r.text.starts_with("{\n  \"answer\""));
        assert!(r.text.ends_with('}'));
    }

    #[test]
    fn no_response_marker_in_both_formats() {
        let n = normalized(json!({ "model": "m", "choices": [] }));
        for f in [ResponseFormat::Markdown, ResponseFormat::Json] {
            let r = render(&n, "q?", f);
            assert_eq!(r.text, NO_RESPONSE_MARKER);
            assert_eq!(r.metadata.finish_reason, "no_response");
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let n = normalized(json!({
            "model": "m",
            "choices": [{ "message": { "content": "x" }, "finish_reason": "stop" }],
            "citations": ["http://a.com"]
        }));
        for f in [ResponseFormat::Markdown, ResponseFormat::Json] {
            assert_eq!(render(&n, "q?", f), render(&n, "q?", f));
        }
    }

    #[test]
    fn thirty_thousand_chars_truncate_to_the_limit() {
        let out = apply_limit("a".repeat(30_000), ResponseFormat::Markdown, CHARACTER_LIMIT);
        assert_eq!(out.chars().count(), CHARACTER_LIMIT);
        let notice = truncation_notice(ResponseFormat::Markdown, 30_000, CHARACTER_LIMIT);
        assert!(out.ends_with(&notice));
        assert!(notice.contains("Original length: 30000 characters"));
        assert!(notice.contains("Truncated to: 25000 characters"));
    }

    #[test]
    fn json_notice_differs_from_markdown_notice() {
        let j = truncation_notice(ResponseFormat::Json, 30_000, CHARACTER_LIMIT);
        let m = truncation_notice(ResponseFormat::Markdown, 30_000, CHARACTER_LIMIT);
        assert_ne!(j, m);
        assert!(j.contains("truncated from 30000 to 25000"));
    }

    #[test]
    fn oversized_answer_is_truncated_through_render() {
        let n = normalized(json!({
            "model": "m",
            "choices": [{ "message": { "content": "é".repeat(30_000) }, "finish_reason": "stop" }]
        }));
        let r = render(&n, "q?", ResponseFormat::Markdown);
        assert_eq!(r.text.chars().count(), CHARACTER_LIMIT);
        assert!(r.text.ends_with("to get more focused results."));
    }

    #[test]
    fn short_text_is_untouched() {
        let s = "x".repeat(CHARACTER_LIMIT);
        assert_eq!(apply_limit(s.clone(), ResponseFormat::Json, CHARACTER_LIMIT), s);
    }

    #[test]
    fn degenerate_limit_never_exceeds() {
        let out = apply_limit("x".repeat(100), ResponseFormat::Json, 10);
        assert_eq!(out.chars().count(), 10);
    }

    proptest! {
        #[test]
        fn truncation_is_exact_and_keeps_the_notice(
            body in "[a-zé🙂 \n]{0,600}",
            json in any::<bool>(),
            limit in 250usize..400,
        ) {
            let format = if json { ResponseFormat::Json } else { ResponseFormat::Markdown };
            let original = body.chars().count();
            let out = apply_limit(body.clone(), format, limit);
            if original <= limit {
                prop_assert_eq!(out, body);
            } else {
                prop_assert_eq!(out.chars().count(), limit);
                let notice = truncation_notice(format, original, limit);
                prop_assert!(out.ends_with(&notice));
            }
        }

        #[test]
        fn total_sources_matches_citations(urls in proptest::collection::vec("http://[a-z]{1,8}\\.com", 0..6), top_level in any::<bool>()) {
            let v = if top_level {
                json!({ "choices": [{ "message": { "content": "a" } }], "citations": urls })
            } else {
                let anns: Vec<_> = urls
                    .iter()
                    .map(|u| json!({ "type": "url_citation", "url_citation": { "url": u } }))
                    .collect();
                json!({ "choices": [{ "message": { "content": "a", "annotations": anns } }] })
            };
            let n = normalized(v);
            prop_assert_eq!(n.metadata.total_sources, n.metadata.citations.len());
            prop_assert_eq!(&n.metadata.citations, &urls);
            let r = render(&n, "q?", ResponseFormat::Json);
            let parsed: serde_json::Value = serde_json::from_str(&r.text).unwrap();
            prop_assert_eq!(parsed["citations"].as_array().unwrap().len(), n.metadata.total_sources);
        }
    }
}
