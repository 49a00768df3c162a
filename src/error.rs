use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

static RETRY_DELAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"retryDelay"\s*:\s*"(\d+(?:\.\d+)?)s""#).expect("retry delay pattern is valid")
});
static TOO_MANY_REQUESTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b429\b").expect("status pattern is valid"));

/// Longest server-suggested wait that is honored as given.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// What went wrong on the remote side of a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Quota or request-rate exhaustion (HTTP 429 and friends)
    RateLimited,
    /// Network failure or a 5xx from the service
    Unavailable,
    /// The service answered but refused or produced nothing usable
    Rejected,
}

/// Failure of a single remote text generation call.
///
/// The transport fills in `kind` and `retry_after`, so callers never have to
/// sniff the message text to decide how long to back off.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl ServiceError {
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            kind: ServiceErrorKind::RateLimited,
            message: message.into(),
            retry_after,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Unavailable,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Rejected,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Classify an error from a generator that only exposes message text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();

        let rate_limited = TOO_MANY_REQUESTS.is_match(&message)
            || lowered.contains("quota")
            || lowered.contains("resource_exhausted");

        if rate_limited {
            let retry_after = parse_retry_delay(&message);
            Self::rate_limited(message, retry_after)
        } else {
            Self::unavailable(message)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ServiceErrorKind::RateLimited
    }
}

/// Extract a server-suggested delay such as `"retryDelay":"5s"` from a payload,
/// capped at [`MAX_RETRY_DELAY`].
pub fn parse_retry_delay(payload: &str) -> Option<Duration> {
    let captures = RETRY_DELAY.captures(payload)?;
    let seconds: f64 = captures.get(1)?.as_str().parse().ok()?;
    let delay = Duration::try_from_secs_f64(seconds).unwrap_or(MAX_RETRY_DELAY);
    Some(delay.min(MAX_RETRY_DELAY))
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Generator not initialized. Please provide your API key.")]
    NotInitialized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to generate content after {attempts} attempts: {source}")]
    GenerationFailed {
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    #[error("Failed to translate text after {attempts} attempts: {source}")]
    TranslationFailed {
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    #[error("Failed to parse quiz questions. Please try again.")]
    QuizParse { reason: String },

    #[error("Translation queue is closed")]
    QueueClosed,

    #[error("Translation job aborted: {0}")]
    JobAborted(String),

    #[error("Preferences I/O error: {0}")]
    PreferencesIo(#[from] std::io::Error),

    #[error("Preferences format error: {0}")]
    PreferencesFormat(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn quiz_parse(reason: impl Into<String>) -> Self {
        Error::QuizParse {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_error(err: &Error) -> Self {
        let message = err.to_string();
        match err {
            Error::NotInitialized => Self::new(
                "not_initialized",
                "No API key configured. Set GEMINI_API_KEY or run `topic-tutor config set-key`.",
                503,
            ),
            Error::Validation(_) => Self::new("validation_error", &message, 422),
            Error::UnsupportedLanguage(_) => Self::new("bad_request", &message, 400),
            Error::GenerationFailed { .. } => Self::new("generation_failed", &message, 502),
            Error::TranslationFailed { .. } | Error::JobAborted(_) => {
                Self::new("translation_failed", &message, 502)
            }
            Error::QuizParse { .. } => Self::new("quiz_parse_error", &message, 502),
            Error::QueueClosed => Self::new("service_unavailable", &message, 503),
            Error::PreferencesIo(_) | Error::PreferencesFormat(_) => {
                Self::new("internal_error", &message, 500)
            }
            Error::Config(_) => Self::new("configuration_error", &message, 500),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Error::QuizParse { reason } = &self {
            tracing::warn!(reason = %reason, "Rejected malformed quiz output");
        }

        let body = ErrorResponse::from_error(&self);
        let status = StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
