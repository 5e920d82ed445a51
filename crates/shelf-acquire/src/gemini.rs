//! Gemini `generateContent` client.
//!
//! ```text
//! POST {endpoint}/v1beta/models/{model}:generateContent
//! x-goog-api-key: <key>
//!
//! { "contents": [ { "parts": [
//!     { "inline_data": { "mime_type": "image/jpeg", "data": "<base64>" } },
//!     { "text": "<instruction>" }
//! ] } ] }
//! ```
//!
//! Status mapping:
//! - 401 / 403        → ServiceUnavailable (bad or missing key)
//! - 429 / 5xx        → Upstream (retryable)
//! - other 4xx        → ServiceUnavailable (request we cannot fix by retrying)
//! - client timeout   → Timeout(request_timeout_secs)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::VisionSettings;
use crate::error::{AcquireError, AcquireResult};
use crate::vision::{VisionModel, VisionRequest};

const USER_AGENT: &str = concat!("shelf-scanner/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn request_body(request: &VisionRequest) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: request.image.mime_type,
                        data: &request.image.data,
                    },
                },
                Part::Text {
                    text: &request.instruction,
                },
            ],
        }],
    }
}

/// Joins the text parts of the first candidate.
fn response_text(response: GenerateContentResponse) -> AcquireResult<String> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(AcquireError::AiScanFailed(match block_reason {
            Some(reason) => format!("request blocked: {}", reason),
            None => "model returned no candidates".to_string(),
        }));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        debug!(finish_reason = ?candidate.finish_reason, "Model candidate carried no text");
    }
    Ok(text)
}

/// Parses a successful response body into the model's answer.
///
/// A body that is not a `generateContent` response is `AiScanFailed`.
fn parse_response(body: &str) -> AcquireResult<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "Unreadable model response");
        AcquireError::AiScanFailed(format!("unreadable model response: {}", e))
    })?;
    response_text(response)
}

/// Maps a non-success status and its body onto an error.
fn status_error(status: u16, body: &str) -> AcquireError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().chars().take(200).collect());

    match status {
        401 | 403 => AcquireError::ServiceUnavailable(format!(
            "vision service rejected the API key ({}): {}",
            status, message
        )),
        429 => AcquireError::Upstream { status, message },
        400..=499 => AcquireError::ServiceUnavailable(format!(
            "vision service refused the request ({}): {}",
            status, message
        )),
        _ => AcquireError::Upstream { status, message },
    }
}

// =============================================================================
// Client
// =============================================================================

/// [`VisionModel`] backed by the Gemini REST API.
pub struct GeminiVisionClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiVisionClient {
    /// Builds a client. Fails with `ServiceUnavailable` if no API key is set.
    pub fn new(settings: &VisionSettings) -> AcquireResult<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AcquireError::ServiceUnavailable("vision API key is not configured".into())
            })?
            .to_string();

        let url = generate_url(&settings.endpoint, &settings.model)?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| AcquireError::ServiceUnavailable(e.to_string()))?;

        Ok(GeminiVisionClient {
            http,
            url,
            api_key,
            timeout_secs: settings.request_timeout_secs,
        })
    }

    /// The resolved `generateContent` URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn transport_error(&self, err: reqwest::Error) -> AcquireError {
        if err.is_timeout() {
            AcquireError::Timeout(self.timeout_secs)
        } else {
            err.into()
        }
    }
}

fn generate_url(endpoint: &str, model: &str) -> AcquireResult<Url> {
    let mut base = Url::parse(endpoint)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("v1beta/models/{}:generateContent", model))?)
}

#[async_trait]
impl VisionModel for GeminiVisionClient {
    async fn generate(&self, request: &VisionRequest) -> AcquireResult<String> {
        debug!(
            url = %self.url,
            mime_type = request.image.mime_type,
            encoded_len = request.image.data.len(),
            "Sending image to vision model"
        );

        let response = self
            .http
            .post(self.url.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::{InlineImage, ISBN_INSTRUCTION};
    use serde_json::json;

    fn sample_request() -> VisionRequest {
        VisionRequest {
            instruction: ISBN_INSTRUCTION.to_string(),
            image: InlineImage {
                mime_type: "image/png",
                data: "iVBORw0K".to_string(),
            },
        }
    }

    #[test]
    fn test_request_body_shape() {
        let request = sample_request();
        let body = serde_json::to_value(request_body(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "parts": [
                        { "inline_data": { "mime_type": "image/png", "data": "iVBORw0K" } },
                        { "text": ISBN_INSTRUCTION }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "978013" }, { "text": "4685991" }], "role": "model" },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(response_text(response).unwrap(), "9780134685991");
    }

    #[test]
    fn test_response_without_candidates() {
        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let err = response_text(blocked).unwrap_err();
        assert!(matches!(err, AcquireError::AiScanFailed(ref m) if m.contains("SAFETY")));

        let empty = GenerateContentResponse::default();
        assert!(matches!(
            response_text(empty),
            Err(AcquireError::AiScanFailed(_))
        ));
    }

    #[test]
    fn test_candidate_without_text_is_empty_answer() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "MAX_TOKENS" }]
        }))
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "");
    }

    #[test]
    fn test_unreadable_body_is_failed_scan() {
        let err = parse_response("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, AcquireError::AiScanFailed(ref m) if m.contains("unreadable")));
        assert!(!err.is_retryable());

        let text = parse_response(
            r#"{"candidates":[{"content":{"parts":[{"text":"9780134685991"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(text, "9780134685991");
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        let err = status_error(403, body);
        assert!(matches!(err, AcquireError::ServiceUnavailable(ref m) if m.contains("API key not valid")));
        assert!(!err.is_retryable());

        let err = status_error(503, "upstream connect error");
        assert!(matches!(err, AcquireError::Upstream { status: 503, ref message } if message == "upstream connect error"));
        assert!(err.is_retryable());

        assert!(status_error(429, "{}").is_retryable());
        let err = status_error(400, "bad image");
        assert!(matches!(err, AcquireError::ServiceUnavailable(ref m) if m.contains("bad image")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_generate_url() {
        let url = generate_url("https://generativelanguage.googleapis.com", "gemini-2.5-flash").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );

        let proxied = generate_url("http://localhost:8080/gemini", "m").unwrap();
        assert_eq!(
            proxied.as_str(),
            "http://localhost:8080/gemini/v1beta/models/m:generateContent"
        );

        assert!(generate_url("not a url", "m").is_err());
    }

    #[test]
    fn test_client_requires_key() {
        let settings = VisionSettings {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            GeminiVisionClient::new(&settings),
            Err(AcquireError::ServiceUnavailable(_))
        ));

        let settings = VisionSettings {
            api_key: Some("test-key".into()),
            ..Default::default()
        };
        let client = GeminiVisionClient::new(&settings).unwrap();
        assert!(client.url().as_str().ends_with(":generateContent"));
    }
}
