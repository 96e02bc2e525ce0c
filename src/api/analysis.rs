//! REST API endpoints for content authenticity analysis

use actix_web::{HttpResponse, post, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::health::{AnalysisReadiness, HealthStatus, ReadinessStatus};
use crate::model::{
    AnalysisRequest, AnalysisResult, Citation, Classification, ConfidenceLevel, Consistency,
    ImageData, ParsedAnalysis, RequestKind, RiskLevel, ScoreConfidence,
};
use crate::service::{AnalysisError, AnalysisService, ErrorKind, RequestError};

/// One piece of content to analyze
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnalyzeRequestBody {
    pub kind: RequestKind,
    /// Text to analyze; optional context for image requests
    pub text: Option<String>,
    /// Base64-encoded image bytes
    pub image_base64: Option<String>,
    /// Image MIME type; sniffed from the bytes when omitted
    pub image_mime_type: Option<String>,
    /// Let the model ground its answer with web search
    #[serde(default)]
    pub use_grounding: bool,
}

impl AnalyzeRequestBody {
    /// Decode the payload and check it against its declared kind
    pub fn into_request(self) -> Result<AnalysisRequest, RequestError> {
        let image = self
            .image_base64
            .as_deref()
            .map(str::trim)
            .filter(|encoded| !encoded.is_empty())
            .map(|encoded| decode_image(encoded, self.image_mime_type.as_deref()))
            .transpose()?;

        AnalysisRequest::new(self.kind, self.text, image, self.use_grounding)
    }
}

fn decode_image(encoded: &str, mime_type: Option<&str>) -> Result<ImageData, RequestError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| RequestError::InvalidImage(format!("not valid base64: {}", e)))?;

    let mime_type = match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
        Some(declared) if declared.starts_with("image/") => declared.to_string(),
        Some(declared) => {
            return Err(RequestError::InvalidImage(format!(
                "unsupported MIME type {}",
                declared
            )));
        }
        None => sniff_mime_type(&bytes)
            .ok_or_else(|| RequestError::InvalidImage("unrecognized image format".to_string()))?
            .to_string(),
    };

    Ok(ImageData::new(mime_type, bytes))
}

fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// A verdict with display fields derived from it
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub result: AnalysisResult,
    pub score_confidence: ScoreConfidence,
    pub risk_guidance: String,
    pub model: String,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResponse {
    fn new(result: AnalysisResult, model: &str) -> Self {
        Self {
            score_confidence: ScoreConfidence::from_score(result.score()),
            risk_guidance: result.risk_level.guidance().to_string(),
            model: model.to_string(),
            analyzed_at: Utc::now(),
            result,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRequestBody {
    pub items: Vec<AnalyzeRequestBody>,
    /// Lower the configured concurrency bound for this batch
    pub max_in_flight: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchItemResponse {
    pub index: usize,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AnalysisError>,
}

impl BatchItemResponse {
    fn from_outcome(index: usize, outcome: Result<AnalysisResult, AnalysisError>) -> Self {
        match outcome {
            Ok(result) => Self {
                index,
                status: ItemStatus::Ok,
                result: Some(result),
                error: None,
            },
            Err(error) => Self {
                index,
                status: ItemStatus::Error,
                result: None,
                error: Some(error),
            },
        }
    }
}

/// Per-item outcomes in request order
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub items: Vec<BatchItemResponse>,
    pub succeeded: usize,
    pub failed: usize,
    pub model: String,
}

/// Analyze a single piece of content
#[utoipa::path(
    post,
    path = "/v1/analyze",
    request_body = AnalyzeRequestBody,
    responses(
        (status = 200, description = "Content analyzed", body = AnalysisResponse),
        (status = 400, description = "Request does not match its declared kind", body = ErrorResponse),
        (status = 502, description = "Model call failed or returned an unusable response", body = ErrorResponse),
        (status = 504, description = "Model call timed out", body = ErrorResponse)
    ),
    tag = "analysis"
)]
#[post("/v1/analyze")]
pub async fn analyze(
    service: web::Data<AnalysisService>,
    body: web::Json<AnalyzeRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner().into_request()?;
    let result = service.analyze(request).await?;

    Ok(HttpResponse::Ok().json(AnalysisResponse::new(result, service.model_name())))
}

/// Analyze many pieces of content concurrently
///
/// Items that fail validation are reported in their slot without calling the
/// model. One failing item never fails the batch.
#[utoipa::path(
    post,
    path = "/v1/analyze/batch",
    request_body = BatchRequestBody,
    responses(
        (status = 200, description = "Batch analyzed; see per-item status", body = BatchResponse),
        (status = 400, description = "Batch exceeds the configured size", body = ErrorResponse)
    ),
    tag = "analysis"
)]
#[post("/v1/analyze/batch")]
pub async fn analyze_batch(
    service: web::Data<AnalysisService>,
    body: web::Json<BatchRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let BatchRequestBody {
        items,
        max_in_flight,
    } = body.into_inner();

    if items.len() > service.max_batch_size() {
        return Err(ApiError::BadRequest(format!(
            "batch of {} items exceeds the limit of {}",
            items.len(),
            service.max_batch_size()
        )));
    }

    let total = items.len();
    let mut slots: Vec<Option<BatchItemResponse>> = (0..total).map(|_| None).collect();
    let mut positions = Vec::with_capacity(total);
    let mut requests = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        match item.into_request() {
            Ok(request) => {
                positions.push(index);
                requests.push(request);
            }
            Err(e) => {
                tracing::debug!(index = index, error = %e, "Batch item rejected");
                let error = AnalysisError::from_request_error(index, &e);
                slots[index] = Some(BatchItemResponse::from_outcome(index, Err(error)));
            }
        }
    }

    let analyzed = service.analyze_batch(requests, max_in_flight).await;
    for (item, index) in analyzed.into_iter().zip(positions) {
        let outcome = item
            .into_outcome()
            .map_err(|error| AnalysisError { index, ..error });
        slots[index] = Some(BatchItemResponse::from_outcome(index, outcome));
    }

    let items: Vec<BatchItemResponse> = slots.into_iter().flatten().collect();
    let failed = items
        .iter()
        .filter(|item| item.status == ItemStatus::Error)
        .count();

    Ok(HttpResponse::Ok().json(BatchResponse {
        succeeded: items.len() - failed,
        failed,
        items,
        model: service.model_name().to_string(),
    }))
}

/// Configure analysis routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze).service(analyze_batch);
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Authenticity Intel API",
        description = "Content authenticity analysis backed by a hosted model"
    ),
    paths(
        analyze,
        analyze_batch,
        crate::api::health::liveness,
        crate::api::health::readiness
    ),
    components(schemas(
        AnalyzeRequestBody,
        AnalysisResponse,
        BatchRequestBody,
        BatchResponse,
        BatchItemResponse,
        ItemStatus,
        ErrorResponse,
        AnalysisError,
        ErrorKind,
        AnalysisResult,
        ParsedAnalysis,
        Citation,
        Classification,
        ConfidenceLevel,
        Consistency,
        RequestKind,
        RiskLevel,
        ScoreConfidence,
        HealthStatus,
        ReadinessStatus,
        AnalysisReadiness
    )),
    tags(
        (name = "analysis", description = "Content authenticity analysis"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
