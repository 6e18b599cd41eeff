//! Process configuration: env-file loading and the `doctor` report.

use drtrips_local::openrouter::{
    API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MODEL, ENDPOINT_ENV, MODEL_ENV,
};
use std::path::{Path, PathBuf};

pub(crate) const ENV_FILE_ENV: &str = "DRTRIPS_ENV_FILE";

/// Parse `KEY=VALUE` lines. Blank lines, `#` comments and an optional `export ` prefix
/// are skipped; one layer of matching quotes around the value is removed.
pub(crate) fn parse_env_lines(txt: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let s = s.strip_prefix("export ").unwrap_or(s);
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        let v = v.trim();
        let v = [('"', '"'), ('\'', '\'')]
            .iter()
            .find_map(|(open, close)| {
                v.strip_prefix(*open)
                    .and_then(|rest| rest.strip_suffix(*close))
            })
            .unwrap_or(v);
        out.push((k.to_string(), v.to_string()));
    }
    out
}

/// Load `DRTRIPS_ENV_FILE` (or `./.env` when unset) into the process environment.
///
/// - an explicitly empty `DRTRIPS_ENV_FILE` disables loading
/// - never overrides variables that are already set
/// - never logs values
///
/// Returns the path that was applied, if any.
pub(crate) fn load_env_file() -> Option<PathBuf> {
    let path = match std::env::var(ENV_FILE_ENV) {
        Ok(p) => {
            let p = p.trim();
            if p.is_empty() {
                return None;
            }
            PathBuf::from(p)
        }
        Err(_) => PathBuf::from(".env"),
    };
    let txt = std::fs::read_to_string(&path).ok()?;
    for (k, v) in parse_env_lines(&txt) {
        // Don't override explicit process env.
        if std::env::var_os(&k).is_none() {
            std::env::set_var(k, v);
        }
    }
    Some(path)
}

/// Configuration summary with no secrets in it.
pub(crate) fn doctor_report(env_file: Option<&Path>) -> serde_json::Value {
    let key_set = drtrips_local::env(API_KEY_ENV).is_some();
    let model_override = drtrips_local::env(MODEL_ENV);
    let endpoint_override = drtrips_local::env(ENDPOINT_ENV);
    let mut warnings = Vec::new();
    if !key_set {
        warnings.push(format!("{API_KEY_ENV} is not set; the server will refuse to start"));
    }
    serde_json::json!({
        "ok": key_set,
        "name": drtrips_research_mcp::SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "tools": [drtrips_research_mcp::TOOL_NAME],
        "configured": {
            "openrouter_api_key": key_set,
        },
        "model": model_override.as_deref().unwrap_or(DEFAULT_MODEL),
        "model_source": if model_override.is_some() { "env" } else { "default" },
        "endpoint": endpoint_override.as_deref().unwrap_or(DEFAULT_ENDPOINT),
        "env_file": env_file.map(|p| p.display().to_string()),
        "character_limit": drtrips_core::CHARACTER_LIMIT,
        "warnings": warnings,
    })
}
