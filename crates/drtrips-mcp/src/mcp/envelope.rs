use drtrips_core::Error;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    NotConfigured,
    RateLimited,
    AuthFailed,
    TimedOut,
    NetworkError,
    UpstreamError,
    UnexpectedError,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::NotConfigured => "not_configured",
            Self::RateLimited => "rate_limited",
            Self::AuthFailed => "auth_failed",
            Self::TimedOut => "timed_out",
            Self::NetworkError => "network_error",
            Self::UpstreamError => "upstream_error",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::RateLimited | Self::TimedOut | Self::NetworkError => true,
            // Needs a different input or a config change first.
            Self::InvalidParams
            | Self::NotConfigured
            | Self::AuthFailed
            | Self::UpstreamError
            | Self::UnexpectedError => false,
        }
    }

    fn hint(self) -> &'static str {
        match self {
            Self::RateLimited => "⚠️ Please wait a few seconds before making another request. The API has usage limits to ensure fair access.",
            Self::AuthFailed | Self::NotConfigured => "🔑 Please check your OPENROUTER_API_KEY environment variable is set correctly. Get your API key from https://openrouter.ai/keys",
            Self::TimedOut => "⏱️ Try with a simpler, more focused query or try again later. Complex queries may take longer to process.",
            Self::NetworkError => "🌐 Please check your internet connection and verify that https://openrouter.ai is accessible.",
            Self::InvalidParams => "📝 query must be 2-500 characters, systemprompt at most 2000 characters, and response_format either \"markdown\" or \"json\". No other arguments are accepted.",
            Self::UpstreamError | Self::UnexpectedError => "💡 Please check your query and try again. If the problem persists, consult the tool documentation.",
        }
    }
}

/// A request-level failure, ready to show to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) code: ErrorCode,
    pub(crate) title: String,
    pub(crate) hint: String,
}

impl Failure {
    fn new(code: ErrorCode, title: impl ToString) -> Self {
        Self {
            code,
            title: title.to_string(),
            hint: code.hint().to_string(),
        }
    }

    pub(crate) fn text(&self) -> String {
        format!("❌ **Error: {}**\n\n{}", self.title, self.hint)
    }

    pub(crate) fn error_obj(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct ErrorObject<'a> {
            code: &'static str,
            message: &'a str,
            hint: &'a str,
            retryable: bool,
        }

        let e = ErrorObject {
            code: self.code.as_str(),
            message: &self.title,
            hint: &self.hint,
            retryable: self.code.retryable(),
        };
        serde_json::json!({ "ok": false, "error": e })
    }
}

fn classify_message(message: &str) -> Option<ErrorCode> {
    let m = message.to_ascii_lowercase();
    if m.contains("rate limit") {
        Some(ErrorCode::RateLimited)
    } else if m.contains("unauthorized") {
        Some(ErrorCode::AuthFailed)
    } else if m.contains("timed out") || m.contains("timeout") {
        Some(ErrorCode::TimedOut)
    } else {
        None
    }
}

/// The single place request-level errors become user-facing text.
pub(crate) fn classify(e: &Error) -> Failure {
    match e {
        Error::Validation(v) => {
            let mut f = Failure::new(ErrorCode::InvalidParams, "Invalid input");
            let details: Vec<String> = v.violations.iter().map(|v| format!("- {v}")).collect();
            f.hint = format!("{}\n\n{}", details.join("\n"), f.hint);
            f
        }
        Error::Configuration(m) => Failure::new(ErrorCode::NotConfigured, m),
        Error::Upstream { status, body, .. } => {
            let code = match status {
                429 => ErrorCode::RateLimited,
                401 | 403 => ErrorCode::AuthFailed,
                408 | 504 => ErrorCode::TimedOut,
                _ => classify_message(body).unwrap_or(ErrorCode::UpstreamError),
            };
            match code {
                ErrorCode::UpstreamError => Failure::new(code, e),
                _ => Failure::new(code, title_for(code)),
            }
        }
        Error::Network { timed_out: true, .. } => {
            Failure::new(ErrorCode::TimedOut, title_for(ErrorCode::TimedOut))
        }
        Error::Network { message, .. } => {
            let code = match classify_message(message) {
                Some(ErrorCode::TimedOut) => ErrorCode::TimedOut,
                _ => ErrorCode::NetworkError,
            };
            Failure::new(code, title_for(code))
        }
        Error::Unknown(m) => match classify_message(m) {
            Some(code) => Failure::new(code, title_for(code)),
            None => Failure::new(ErrorCode::UnexpectedError, m),
        },
    }
}

fn title_for(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::RateLimited => "Rate limit exceeded",
        ErrorCode::AuthFailed => "Authentication failed",
        ErrorCode::TimedOut => "Request timed out",
        ErrorCode::NetworkError => "Network connection error",
        ErrorCode::InvalidParams => "Invalid input",
        ErrorCode::NotConfigured => "Not configured",
        ErrorCode::UpstreamError | ErrorCode::UnexpectedError => "Unknown error occurred",
    }
}
