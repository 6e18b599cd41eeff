//! Caller-supplied research arguments and their validation.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const QUERY_MIN_CHARS: usize = 2;
pub const QUERY_MAX_CHARS: usize = 500;
pub const SYSTEM_PROMPT_MAX_CHARS: usize = 2000;

const KNOWN_KEYS: [&str; 3] = ["query", "systemprompt", "response_format"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Json,
}

impl ResponseFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "markdown" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systemprompt: Option<String>,
    pub response_format: ResponseFormat,
}

impl ResearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            systemprompt: None,
            response_format: ResponseFormat::default(),
        }
    }

    /// The caller's system prompt, if one was given and is non-empty.
    pub fn system_prompt(&self) -> Option<&str> {
        self.systemprompt.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every constraint the input broke, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid input: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Validate untrusted tool arguments.
///
/// `null` is treated as an empty argument map. Unknown keys are rejected so that a
/// misspelled field (e.g. `system_prompt`) fails loudly instead of being dropped.
pub fn validate(input: &serde_json::Value) -> Result<ResearchQuery, ValidationError> {
    let empty = serde_json::Map::new();
    let obj = match input {
        serde_json::Value::Object(m) => m,
        serde_json::Value::Null => &empty,
        other => {
            return Err(ValidationError {
                violations: vec![Violation::new(
                    "",
                    format!("Expected object, received {}", json_type(other)),
                )],
            })
        }
    };

    let mut violations = Vec::new();

    let query = match obj.get("query") {
        None | Some(serde_json::Value::Null) => {
            violations.push(Violation::new("query", "Required"));
            None
        }
        Some(serde_json::Value::String(s)) => {
            let n = s.chars().count();
            if n < QUERY_MIN_CHARS {
                violations.push(Violation::new(
                    "query",
                    format!("Query must be at least {QUERY_MIN_CHARS} characters"),
                ));
            } else if n > QUERY_MAX_CHARS {
                violations.push(Violation::new(
                    "query",
                    format!("Query must not exceed {QUERY_MAX_CHARS} characters"),
                ));
            }
            Some(s.clone())
        }
        Some(other) => {
            violations.push(Violation::new(
                "query",
                format!("Expected string, received {}", json_type(other)),
            ));
            None
        }
    };

    let systemprompt = match obj.get("systemprompt") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => {
            if s.chars().count() > SYSTEM_PROMPT_MAX_CHARS {
                violations.push(Violation::new(
                    "systemprompt",
                    format!("System prompt must not exceed {SYSTEM_PROMPT_MAX_CHARS} characters"),
                ));
            }
            Some(s.clone())
        }
        Some(other) => {
            violations.push(Violation::new(
                "systemprompt",
                format!("Expected string, received {}", json_type(other)),
            ));
            None
        }
    };

    let response_format = match obj.get("response_format") {
        None | Some(serde_json::Value::Null) => ResponseFormat::default(),
        Some(serde_json::Value::String(s)) => ResponseFormat::parse(s).unwrap_or_else(|| {
            violations.push(Violation::new(
                "response_format",
                format!("Invalid enum value. Expected 'markdown' | 'json', received '{s}'"),
            ));
            ResponseFormat::default()
        }),
        Some(other) => {
            violations.push(Violation::new(
                "response_format",
                format!("Expected string, received {}", json_type(other)),
            ));
            ResponseFormat::default()
        }
    };

    for k in obj.keys() {
        if !KNOWN_KEYS.contains(&k.as_str()) {
            violations.push(Violation::new("", format!("Unrecognized key: `{k}`")));
        }
    }

    match query {
        Some(query) if violations.is_empty() => Ok(ResearchQuery {
            query,
            systemprompt,
            response_format,
        }),
        _ => Err(ValidationError { violations }),
    }
}

/// JSON Schema advertised to MCP clients. Mirrors the rules enforced by [`validate`].
pub fn input_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "minLength": QUERY_MIN_CHARS,
                "maxLength": QUERY_MAX_CHARS,
                "description": "The research query or question to search for"
            },
            "systemprompt": {
                "type": "string",
                "maxLength": SYSTEM_PROMPT_MAX_CHARS,
                "description": "Optional system prompt to customize the research behavior"
            },
            "response_format": {
                "type": "string",
                "enum": ["markdown", "json"],
                "default": "markdown",
                "description": "Output format: 'markdown' for human-readable or 'json' for machine-readable"
            }
        },
        "required": ["query"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_query_defaults_to_markdown() {
        let q = validate(&json!({ "query": "What is 2+2?" })).unwrap();
        assert_eq!(q.query, "What is 2+2?");
        assert_eq!(q.systemprompt, None);
        assert_eq!(q.response_format, ResponseFormat::Markdown);
    }

    #[test]
    fn accepts_all_fields() {
        let q = validate(&json!({
            "query": "best ramen in Osaka",
            "systemprompt": "You are a travel expert.",
            "response_format": "json"
        }))
        .unwrap();
        assert_eq!(q.system_prompt(), Some("You are a travel expert."));
        assert_eq!(q.response_format, ResponseFormat::Json);
    }

    #[test]
    fn query_of_one_char_is_rejected() {
        let e = validate(&json!({ "query": "x" })).unwrap_err();
        assert_eq!(e.violations.len(), 1);
        assert_eq!(e.violations[0].path, "query");
        assert!(e.violations[0].message.contains("at least 2"));
    }

    #[test]
    fn length_bounds_count_chars_not_bytes() {
        // 250 two-byte chars: 500 bytes over budget in bytes, exactly at the char limit.
        let q = "é".repeat(QUERY_MAX_CHARS);
        assert!(validate(&json!({ "query": q })).is_ok());
        let q = "é".repeat(QUERY_MAX_CHARS + 1);
        let e = validate(&json!({ "query": q })).unwrap_err();
        assert!(e.violations[0].message.contains("must not exceed 500"));
    }

    #[test]
    fn reports_every_violation() {
        let e = validate(&json!({
            "query": "",
            "systemprompt": "s".repeat(SYSTEM_PROMPT_MAX_CHARS + 1),
            "response_format": "yaml",
            "system_prompt": "typo"
        }))
        .unwrap_err();
        let paths: Vec<&str> = e.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["query", "systemprompt", "response_format", ""]);
        let s = e.to_string();
        assert!(s.starts_with("Invalid input: "));
        assert!(s.contains("Unrecognized key: `system_prompt`"));
    }

    #[test]
    fn missing_query_and_wrong_types() {
        let e = validate(&json!({ "systemprompt": 5, "response_format": true })).unwrap_err();
        assert_eq!(e.violations.len(), 3);
        assert_eq!(e.violations[0].message, "Required");
        assert!(e.violations[1].message.contains("received number"));
        assert!(e.violations[2].message.contains("received boolean"));
    }

    #[test]
    fn null_arguments_are_an_empty_object() {
        let e = validate(&serde_json::Value::Null).unwrap_err();
        assert_eq!(e.violations, vec![Violation::new("query", "Required")]);
    }

    #[test]
    fn non_object_is_rejected() {
        let e = validate(&json!(["query"])).unwrap_err();
        assert!(e.violations[0].message.contains("received array"));
    }

    #[test]
    fn null_optionals_are_absent() {
        let q = validate(&json!({
            "query": "ok query",
            "systemprompt": null,
            "response_format": null
        }))
        .unwrap();
        assert_eq!(q.systemprompt, None);
        assert_eq!(q.response_format, ResponseFormat::Markdown);
    }

    #[test]
    fn empty_system_prompt_falls_back() {
        let q = validate(&json!({ "query": "ok query", "systemprompt": "" })).unwrap();
        assert_eq!(q.system_prompt(), None);
    }

    #[test]
    fn schema_matches_validator_bounds() {
        let s = input_schema();
        assert_eq!(s["properties"]["query"]["minLength"], json!(QUERY_MIN_CHARS));
        assert_eq!(s["properties"]["query"]["maxLength"], json!(QUERY_MAX_CHARS));
        assert_eq!(s["additionalProperties"], json!(false));
        let props = s["properties"].as_object().unwrap();
        for k in KNOWN_KEYS {
            assert!(props.contains_key(k), "schema missing {k}");
        }
    }
}
