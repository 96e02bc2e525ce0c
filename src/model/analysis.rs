//! Analysis request, raw model response, and structured verdict types

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::error::RequestError;

/// What kind of content a request carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Text,
    Image,
    Multimodal,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Text => write!(f, "text"),
            RequestKind::Image => write!(f, "image"),
            RequestKind::Multimodal => write!(f, "multimodal"),
        }
    }
}

/// Opaque image handle passed through to the analysis client
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.len())
            .finish()
    }
}

/// A single unit of work for the analysis client
///
/// Fields are private so the kind/content pairing can only be built through
/// the checked constructors:
/// - `Text` carries non-blank text and no image
/// - `Image` carries an image; text, if any, is caller context the parser never reads
/// - `Multimodal` carries both
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    kind: RequestKind,
    text: Option<String>,
    image: Option<ImageData>,
    use_grounding: bool,
}

impl AnalysisRequest {
    /// Build a request, checking that the content matches the kind
    pub fn new(
        kind: RequestKind,
        text: Option<String>,
        image: Option<ImageData>,
        use_grounding: bool,
    ) -> Result<Self, RequestError> {
        let text = text.filter(|t| !t.trim().is_empty());

        match kind {
            RequestKind::Text => {
                if text.is_none() {
                    return Err(RequestError::MissingText(kind));
                }
                if image.is_some() {
                    return Err(RequestError::UnexpectedImage);
                }
            }
            RequestKind::Image => {
                if image.as_ref().is_none_or(ImageData::is_empty) {
                    return Err(RequestError::MissingImage(kind));
                }
            }
            RequestKind::Multimodal => {
                if text.is_none() {
                    return Err(RequestError::MissingText(kind));
                }
                if image.as_ref().is_none_or(ImageData::is_empty) {
                    return Err(RequestError::MissingImage(kind));
                }
            }
        }

        Ok(Self {
            kind,
            text,
            image,
            use_grounding,
        })
    }

    pub fn text(text: impl Into<String>, use_grounding: bool) -> Result<Self, RequestError> {
        Self::new(RequestKind::Text, Some(text.into()), None, use_grounding)
    }

    /// Image-only request; `context` is forwarded to the model but not required
    pub fn image(image: ImageData, context: Option<String>) -> Result<Self, RequestError> {
        Self::new(RequestKind::Image, context, Some(image), false)
    }

    pub fn multimodal(
        text: impl Into<String>,
        image: ImageData,
        use_grounding: bool,
    ) -> Result<Self, RequestError> {
        Self::new(
            RequestKind::Multimodal,
            Some(text.into()),
            Some(image),
            use_grounding,
        )
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image_data(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }

    pub fn use_grounding(&self) -> bool {
        self.use_grounding
    }
}

/// A web source the model cited while grounding its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Citation {
    pub source_url: String,
    pub snippet: String,
}

/// Output of one analysis client call, consumed immediately by the extractor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawModelResponse {
    /// `None` when the model returned no text at all
    pub body: Option<String>,
    pub grounding_metadata: Option<Vec<Citation>>,
}

impl RawModelResponse {
    pub fn from_text(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            grounding_metadata: None,
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.grounding_metadata = Some(citations);
        self
    }
}

/// Closed-set authenticity verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Authentic,
    LikelyAuthentic,
    Uncertain,
    LikelyFake,
    Fake,
}

impl Classification {
    /// Score band fallback used when no classification keyword is found
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Classification::Authentic,
            60..80 => Classification::LikelyAuthentic,
            40..60 => Classification::Uncertain,
            20..40 => Classification::LikelyFake,
            _ => Classification::Fake,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Authentic => "Authentic",
            Classification::LikelyAuthentic => "Likely Authentic",
            Classification::Uncertain => "Uncertain",
            Classification::LikelyFake => "Likely Fake",
            Classification::Fake => "Fake",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Confidence the model stated in its own answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// Cross-modal agreement between the text and the image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Consistent,
    PartiallyConsistent,
    Inconsistent,
    /// Numeric agreement normalised to [0, 1]
    Scored(f64),
}

/// Parser output: every field of the verdict except the derived risk level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParsedAnalysis {
    /// 0-100, higher means more likely authentic
    pub score: u8,
    pub classification: Classification,
    pub evidence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<Consistency>,
    pub citations: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceLevel>,
    pub red_flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// User-facing guidance tier derived from classification and score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn guidance(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low risk - content appears reliable",
            RiskLevel::Medium => "Medium risk - additional verification recommended",
            RiskLevel::High => "High risk - verify through multiple independent sources",
            RiskLevel::Critical => "Critical risk - do not share or believe",
        }
    }
}

/// Display band for how much the score itself can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoreConfidence {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ScoreConfidence {
    pub fn from_score(score: u8) -> Self {
        match score {
            85.. => ScoreConfidence::VeryHigh,
            70..85 => ScoreConfidence::High,
            55..70 => ScoreConfidence::Medium,
            40..55 => ScoreConfidence::Low,
            _ => ScoreConfidence::VeryLow,
        }
    }
}

/// Final verdict handed to callers; immutable once built by the risk classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub analysis: ParsedAnalysis,
    pub risk_level: RiskLevel,
}

impl AnalysisResult {
    pub fn score(&self) -> u8 {
        self.analysis.score
    }

    pub fn classification(&self) -> Classification {
        self.analysis.classification
    }
}
