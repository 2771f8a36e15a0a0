//! Vision endpoint clients.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extraction::{parse_extraction, ExtractedBillFields, ExtractionError, ExtractionResult};
use crate::prompts::{EXTRACTION_PROMPT, IMAGE_MIME_TYPE};

/// Default public endpoint for `generateContent`.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default vision-capable model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Anything that can turn a bill photo into bill fields.
pub trait VisionClient: Send + Sync {
    fn extract(&self, image: &[u8]) -> ExtractionResult<ExtractedBillFields>;
}

// =========================================================================
// Wire types
// =========================================================================

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Text { text: String },
    Image { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl GenerateRequest {
    /// Single-shot request: the prompt followed by the base64 image.
    pub fn for_image(prompt: &str, image: &[u8]) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: IMAGE_MIME_TYPE.to_string(),
                            data: STANDARD.encode(image),
                        },
                    },
                ],
            }],
        }
    }
}

/// Response body from `generateContent`. Only the fields we read.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

/// `candidates[0].content.parts[0].text`.
pub fn first_candidate_text(response: &GenerateResponse) -> ExtractionResult<&str> {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.as_deref())
        .ok_or_else(|| ExtractionError::InvalidFormat("Response has no candidate text".into()))
}

// =========================================================================
// Gemini
// =========================================================================

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> ExtractionResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Endpoint URL without the key; the key travels as a query parameter.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl VisionClient for GeminiClient {
    fn extract(&self, image: &[u8]) -> ExtractionResult<ExtractedBillFields> {
        let body = GenerateRequest::for_image(EXTRACTION_PROMPT, image);
        debug!(model = %self.model, image_bytes = image.len(), "Sending bill image for extraction");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Network(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    // reqwest embeds the URL, which carries the key.
                    ExtractionError::Network(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "Vision endpoint rejected request");
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::InvalidFormat(e.without_url().to_string()))?;

        parse_extraction(first_candidate_text(&parsed)?)
    }
}

// =========================================================================
// Mock
// =========================================================================

/// Mock client for testing. Returns canned model text, or a canned failure.
pub struct MockVisionClient {
    response: Result<String, String>,
}

impl MockVisionClient {
    /// Respond as if the model had produced `text`.
    pub fn new(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
        }
    }

    /// Fail every call as an unreachable endpoint.
    pub fn unreachable(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
        }
    }
}

impl VisionClient for MockVisionClient {
    fn extract(&self, _image: &[u8]) -> ExtractionResult<ExtractedBillFields> {
        match &self.response {
            Ok(text) => parse_extraction(text),
            Err(reason) => Err(ExtractionError::Network(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest::for_image("read this", b"\xff\xd8\xff");
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "read this");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "/9j/");
    }

    #[test]
    fn test_first_candidate_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{}"},{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(&response).unwrap(), "{}");
    }

    #[test]
    fn test_first_candidate_missing() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            first_candidate_text(&response),
            Err(ExtractionError::InvalidFormat(_))
        ));

        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(first_candidate_text(&response).is_err());
    }

    #[test]
    fn test_gemini_endpoint() {
        let client = GeminiClient::new(DEFAULT_BASE_URL, "gemini-1.5-flash", "k", 30).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert!(!client.endpoint().contains("key="));
    }

    #[test]
    fn test_gemini_trims_trailing_slash() {
        let client = GeminiClient::new("http://localhost:9999/", "m", "k", 5).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_gemini_unreachable_is_network_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = GeminiClient::new("http://127.0.0.1:9", "m", "k", 2).unwrap();
        let err = client.extract(b"img").unwrap_err();
        assert!(err.is_network());
    }

    #[test]
    fn test_mock_client() {
        let client = MockVisionClient::new(r#"{"vendorName":"Acme","billAmount":1,"billDate":null}"#);
        let fields = client.extract(b"").unwrap();
        assert_eq!(fields.vendor_name.as_deref(), Some("Acme"));

        let client = MockVisionClient::unreachable("offline");
        assert!(client.extract(b"").unwrap_err().is_network());
    }
}
