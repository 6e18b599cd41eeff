//! Local (reqwest) implementations of the drtrips backend traits.

pub mod openrouter;

pub use openrouter::{ClientConfig, OpenRouterClient};

/// Trimmed env var; empty counts as unset.
pub fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
