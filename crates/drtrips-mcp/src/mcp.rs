use drtrips_core::{
    normalize, query, render, Error as ResearchError, ResearchBackend, ResearchQuery,
    ResearchResult, ResearchUsage,
};
use drtrips_local::{ClientConfig, OpenRouterClient};
use drtrips_research_mcp::{SERVER_NAME, TOOL_NAME};
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
        ToolAnnotations,
    },
    service::RequestContext,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServiceExt,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

mod envelope;
use envelope::classify;

const TOOL_DESCRIPTION: &str = r#"Perform research queries using Perplexity AI with customizable system prompts and response formats.

This tool uses Perplexity AI models via OpenRouter to search the web and provide comprehensive, cited research answers. It supports custom system prompts to tailor research behavior for specific domains (travel, technical research, business analysis, etc.) and offers both human-readable and machine-readable output formats.

Args:
  - query (string, required): The research question or query to search for
    * Must be 2-500 characters
    * Examples: "What are the latest developments in quantum computing?", "Best travel destinations in Southeast Asia for families"

  - systemprompt (string, optional): Custom system prompt to guide research behavior
    * Maximum 2000 characters
    * If not provided, uses default research assistant prompt

  - response_format (string, optional): Output format preference
    * Options: "markdown" (default) or "json"
    * "markdown": Human-readable format with citations and metadata footer
    * "json": Machine-readable structured data suitable for programmatic processing

Returns:
  content[0].text (string) plus structured metadata:
  - For MARKDOWN: Main content + citations section + query summary footer
  - For JSON: {"answer": "...", "citations": [...], "model": "...", "finish_reason": "...", "usage": {...}, "total_sources": N}
  - metadata: {query, systemprompt, timestamp, model, finish_reason, usage, citations, total_sources}

Error Handling:
  - "Rate limit exceeded": Wait before making another request
  - "Authentication failed": Check OPENROUTER_API_KEY environment variable
  - "Request timed out": Try with a simpler, more focused query
  - "Invalid input": Ensure query is between 2-500 characters

Performance Notes:
  - Responses limited to 25,000 characters to optimize context usage
  - If truncated, refine query to be more specific"#;

#[derive(Serialize)]
struct ToolMetadata<'a> {
    query: &'a str,
    systemprompt: &'a str,
    timestamp: String,
    model: &'a str,
    usage: &'a ResearchUsage,
    citations: &'a [String],
    total_sources: usize,
    finish_reason: &'a str,
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn success_result(q: &ResearchQuery, result: ResearchResult) -> CallToolResult {
    let m = &result.metadata;
    let meta = ToolMetadata {
        query: &q.query,
        systemprompt: q.system_prompt().unwrap_or("default"),
        timestamp: now_rfc3339(),
        model: &m.model,
        usage: &m.usage,
        citations: &m.citations,
        total_sources: m.total_sources,
        finish_reason: &m.finish_reason,
    };
    let structured = serde_json::to_value(&meta).ok();
    let mut r = CallToolResult::success(vec![Content::text(result.text)]);
    r.structured_content = structured;
    r
}

fn error_result(e: &ResearchError) -> CallToolResult {
    let f = classify(e);
    let mut r = CallToolResult::error(vec![Content::text(f.text())]);
    r.structured_content = Some(f.error_obj());
    r
}

#[derive(Clone)]
pub(crate) struct ResearchMcp {
    backend: Arc<dyn ResearchBackend>,
}

impl ResearchMcp {
    pub(crate) fn new(backend: Arc<dyn ResearchBackend>) -> Self {
        Self { backend }
    }

    pub(crate) fn from_config(cfg: ClientConfig) -> Result<Self, ResearchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("drtrips-research-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResearchError::Configuration(e.to_string()))?;
        let client = OpenRouterClient::new(http, cfg)?;
        log::info!("upstream endpoint: {}", client.endpoint());
        Ok(Self::new(Arc::new(client)))
    }

    fn tool() -> Tool {
        let schema = match query::input_schema() {
            serde_json::Value::Object(m) => m,
            _ => JsonObject::new(),
        };
        Tool::new(TOOL_NAME, TOOL_DESCRIPTION, Arc::new(schema)).annotate(
            ToolAnnotations::new()
                .read_only(true)
                .destructive(false)
                .idempotent(true)
                .open_world(true),
        )
    }

    /// Validate, ask the backend once, normalize, render. Never fails at the protocol
    /// level: every request-level error becomes an `is_error` result.
    pub(crate) async fn drtrips_research(&self, args: Option<JsonObject>) -> CallToolResult {
        let t0 = Instant::now();
        let input = args
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);

        let q = match query::validate(&input) {
            Ok(q) => q,
            Err(e) => {
                log::info!("{TOOL_NAME}: rejected input ({} violations)", e.violations.len());
                return error_result(&ResearchError::Validation(e));
            }
        };
        log::info!(
            "{TOOL_NAME}: query_chars={} format={} custom_prompt={} backend={} model={}",
            q.query.chars().count(),
            q.response_format.as_str(),
            q.system_prompt().is_some(),
            self.backend.name(),
            self.backend.model()
        );

        let raw = match self.backend.research(&q).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("{TOOL_NAME}: upstream failed: {e}");
                return error_result(&e);
            }
        };

        let result = render(&normalize(&raw), &q.query, q.response_format);
        log::debug!(
            "{TOOL_NAME}: done in {}ms (chars={}, sources={})",
            t0.elapsed().as_millis(),
            result.text.chars().count(),
            result.metadata.total_sources
        );
        success_result(&q, result)
    }
}

impl rmcp::ServerHandler for ResearchMcp {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = SERVER_NAME.to_string();
        server_info.version = env!("CARGO_PKG_VERSION").to_string();
        ServerInfo {
            instructions: Some(
                "Cited web research via Perplexity (OpenRouter). One tool: drtrips_research. Output is markdown by default or JSON on request, capped at 25,000 characters."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(vec![Self::tool()]))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if request.name.as_ref() != TOOL_NAME {
            return Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ));
        }
        Ok(self.drtrips_research(request.arguments).await)
    }
}

pub(crate) async fn serve_stdio(svc: ResearchMcp) -> Result<(), McpError> {
    let running = svc
        .serve(stdio())
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    // Keep the stdio server alive until the client closes.
    running
        .waiting()
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(())
}
