//! Gemini `generateContent` client
//!
//! Sends the configured output-format instructions plus the request content
//! to the hosted model and maps the reply into a [`RawModelResponse`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::AnalysisClient;
use crate::model::{
    AnalysisRequest, Citation, GeminiConfig, ImageData, RawModelResponse, RequestKind,
};
use crate::service::error::AnalysisFailure;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GeminiClientError {
    #[error("Gemini API key is empty")]
    MissingApiKey,

    #[error("Invalid Gemini endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Client for the Gemini generative language API
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: Url,
    config: GeminiConfig,
}

// Request models

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

// Response models - only the fields we need

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    grounding_supports: Vec<GroundingSupport>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingSupport {
    segment: Option<Segment>,
    #[serde(default)]
    grounding_chunk_indices: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct Segment {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a client for `config.model`; the key is sent as a header, never in the URL
    pub fn new(api_key: impl Into<String>, config: GeminiConfig) -> Result<Self, GeminiClientError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GeminiClientError::MissingApiKey);
        }

        let endpoint = endpoint_for(&config.base_url, &config.model)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        tracing::debug!(
            endpoint = %endpoint,
            request_timeout_secs = config.request_timeout_secs,
            "Gemini client created"
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            config,
        })
    }

    fn map_send_error(&self, error: reqwest::Error) -> AnalysisFailure {
        if error.is_timeout() {
            AnalysisFailure::Timeout(self.config.request_timeout())
        } else {
            AnalysisFailure::TransportFailure(format!("HTTP request failed: {}", error))
        }
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<RawModelResponse, AnalysisFailure> {
        let body = build_request_body(&self.config, request);

        tracing::debug!(
            model = %self.config.model,
            kind = %request.kind(),
            use_grounding = request.use_grounding(),
            image_bytes = request.image_data().map_or(0, ImageData::len),
            "Calling Gemini generateContent"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_failure(status, &detail, self.config.request_timeout()));
        }

        let payload = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let decoded: GenerateContentResponse = serde_json::from_slice(&payload).map_err(|e| {
            AnalysisFailure::InvalidResponse(format!("Failed to deserialize response: {}", e))
        })?;

        Ok(into_raw_response(decoded))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn endpoint_for(base_url: &Url, model: &str) -> Result<Url, GeminiClientError> {
    if model.trim().is_empty() {
        return Err(GeminiClientError::InvalidEndpoint("model name is empty".to_string()));
    }

    let base = base_url.as_str().trim_end_matches('/');
    let raw = format!("{}/models/{}:generateContent", base, model.trim());
    Url::parse(&raw).map_err(|e| GeminiClientError::InvalidEndpoint(format!("{}: {}", raw, e)))
}

/// Failure for a non-success HTTP status; upstream deadline statuses report `timeout`
fn status_failure(status: StatusCode, detail: &str, timeout: Duration) -> AnalysisFailure {
    if matches!(status, StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT) {
        tracing::warn!(status = status.as_u16(), "Gemini reported an upstream timeout");
        return AnalysisFailure::Timeout(timeout);
    }

    let detail: String = detail.chars().take(200).collect();
    let reason = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "authentication rejected",
        StatusCode::TOO_MANY_REQUESTS => "quota exceeded",
        s if s.is_server_error() => "provider unavailable",
        _ => "request rejected",
    };
    AnalysisFailure::TransportFailure(format!("HTTP {} ({}): {}", status.as_u16(), reason, detail))
}

fn build_request_body(config: &GeminiConfig, request: &AnalysisRequest) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: config.instructions.clone(),
    }];

    if let Some(text) = request.text_content() {
        let heading = match request.kind() {
            RequestKind::Image => "Context supplied with the image:",
            RequestKind::Text | RequestKind::Multimodal => "Content to analyze:",
        };
        parts.push(Part::Text {
            text: format!("{}\n{}", heading, text),
        });
    }

    if let Some(image) = request.image_data() {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.bytes),
            },
        });
    }

    let tools = if request.use_grounding() {
        vec![Tool {
            google_search: GoogleSearch {},
        }]
    } else {
        Vec::new()
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        tools,
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            top_p: config.top_p,
            top_k: config.top_k,
        },
    }
}

fn into_raw_response(response: GenerateContentResponse) -> RawModelResponse {
    let Some(candidate) = response.candidates.into_iter().next() else {
        tracing::warn!("Gemini returned no candidates");
        return RawModelResponse::default();
    };

    let texts: Vec<String> = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let body = if texts.is_empty() {
        tracing::warn!(
            finish_reason = ?candidate.finish_reason,
            "Gemini candidate carried no text"
        );
        None
    } else {
        Some(texts.concat())
    };

    RawModelResponse {
        body,
        grounding_metadata: candidate.grounding_metadata.map(citations_from),
    }
}

/// One citation per web chunk, snippet from the first support segment that references it
fn citations_from(metadata: GroundingMetadata) -> Vec<Citation> {
    let GroundingMetadata {
        grounding_chunks,
        grounding_supports,
    } = metadata;

    grounding_chunks
        .into_iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            let web = chunk.web?;
            let source_url = web.uri?;
            let snippet = grounding_supports
                .iter()
                .filter(|support| support.grounding_chunk_indices.contains(&index))
                .find_map(|support| support.segment.as_ref()?.text.clone())
                .or(web.title)
                .unwrap_or_default();
            Some(Citation {
                source_url,
                snippet,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageData;

    #[test]
    fn test_endpoint() {
        let config = GeminiConfig::default();
        let url = endpoint_for(&config.base_url, "gemini-2.0-flash").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );

        let base = Url::parse("http://localhost:9000/v1beta/").unwrap();
        assert_eq!(
            endpoint_for(&base, "m").unwrap().as_str(),
            "http://localhost:9000/v1beta/models/m:generateContent"
        );
        assert!(endpoint_for(&base, " ").is_err());
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(matches!(
            GeminiClient::new("  ", GeminiConfig::default()),
            Err(GeminiClientError::MissingApiKey)
        ));
    }

    #[test]
    fn test_text_request_body() {
        let config = GeminiConfig::default();
        let request = AnalysisRequest::text("Breaking news", true).unwrap();

        let body = serde_json::to_value(build_request_body(&config, &request)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts.as_array().unwrap().len(), 2);
        assert_eq!(parts[0]["text"], config.instructions.as_str());
        assert_eq!(parts[1]["text"], "Content to analyze:\nBreaking news");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["tools"][0]["googleSearch"], serde_json::json!({}));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2500);
        assert_eq!(body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn test_image_request_body() {
        let config = GeminiConfig::default();
        let image = ImageData::new("image/png", vec![1u8, 2, 3]);
        let request = AnalysisRequest::image(image, None).unwrap();

        let body = serde_json::to_value(build_request_body(&config, &request)).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_response_mapping() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "AUTHENTICITY SCORE: 80\n"}, {"text": "CLASSIFICATION: AUTHENTIC"}]},
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://news.example/a", "title": "news.example"}},
                        {"web": {"uri": "https://wire.example/b", "title": "wire.example"}},
                        {"retrievedContext": {}}
                    ],
                    "groundingSupports": [
                        {"segment": {"text": "Officials confirmed the event."}, "groundingChunkIndices": [1]}
                    ]
                }
            }]
        }"#;

        let decoded: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let raw = into_raw_response(decoded);

        assert_eq!(
            raw.body.as_deref(),
            Some("AUTHENTICITY SCORE: 80\nCLASSIFICATION: AUTHENTIC")
        );
        assert_eq!(
            raw.grounding_metadata,
            Some(vec![
                Citation {
                    source_url: "https://news.example/a".to_string(),
                    snippet: "news.example".to_string(),
                },
                Citation {
                    source_url: "https://wire.example/b".to_string(),
                    snippet: "Officials confirmed the event.".to_string(),
                },
            ])
        );
    }

    #[test]
    fn test_blocked_response_has_no_body() {
        let json = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let decoded: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(into_raw_response(decoded).body, None);

        let decoded: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(into_raw_response(decoded), RawModelResponse::default());
    }

    #[test]
    fn test_status_failures_are_transport() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let failure = status_failure(status, "details", Duration::from_secs(90));
            assert!(matches!(failure, AnalysisFailure::TransportFailure(_)));
        }

        let failure = status_failure(
            StatusCode::TOO_MANY_REQUESTS,
            "Resource exhausted",
            Duration::from_secs(90),
        );
        assert_eq!(
            failure.to_string(),
            "Analysis transport failed: HTTP 429 (quota exceeded): Resource exhausted"
        );
    }

    #[test]
    fn test_upstream_deadline_statuses_are_timeouts() {
        let timeout = Duration::from_secs(90);
        for status in [StatusCode::GATEWAY_TIMEOUT, StatusCode::REQUEST_TIMEOUT] {
            let failure = status_failure(status, "Deadline exceeded", timeout);
            assert_eq!(failure, AnalysisFailure::Timeout(timeout));
            assert_eq!(failure.kind(), crate::service::ErrorKind::Timeout);
        }
    }
}
