//! `drtrips-research-mcp` crate (library surface).
//!
//! The primary entrypoint is the `drtrips-research-mcp` binary (MCP stdio server).
//! This module re-exports the core types so embedders and tests do not depend on the
//! internal crate layout.

pub use drtrips_core as core;

/// Name advertised in the MCP `initialize` handshake.
pub const SERVER_NAME: &str = "drtrips-research-mcp";

/// The one tool this server exposes.
pub const TOOL_NAME: &str = "drtrips_research";
