use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{parse_retry_delay, Error, Result, ServiceError};
use crate::generator::{GenerationOptions, TextGenerator};

/// `generateContent` client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationOptions,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::NotInitialized);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> std::result::Result<String, ServiceError> {
        let request = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: *options,
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::unavailable(format!("Request to Gemini failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::unavailable(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        debug!(model = %self.model, bytes = body.len(), "Gemini response received");

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::rejected(format!("Unexpected Gemini response: {}", e)))?;
        parsed
            .into_text()
            .ok_or_else(|| ServiceError::rejected("Gemini returned no text"))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Turn a non-success Gemini reply into a structured error.
pub fn classify_failure(status: StatusCode, body: &str) -> ServiceError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };
    let message = format!("[{}] {}", status.as_u16(), message);

    let exhausted = status == StatusCode::TOO_MANY_REQUESTS
        || api_status == "RESOURCE_EXHAUSTED"
        || message.to_ascii_lowercase().contains("quota");

    if exhausted {
        ServiceError::rate_limited(message, parse_retry_delay(body))
    } else if status.is_server_error() {
        ServiceError::unavailable(message)
    } else {
        ServiceError::rejected(message)
    }
}
