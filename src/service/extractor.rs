//! Pulls the text block and citation list out of a raw model response

use crate::model::{Citation, RawModelResponse};
use crate::service::error::AnalysisFailure;

/// Text and citations ready for parsing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedResponse {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Extract the text block and normalized citations from a response
///
/// An empty body is valid and yields an empty text block. A missing body is a
/// client contract violation. Citations are trimmed and entries without a
/// source URL are dropped; order is preserved.
pub fn extract(response: RawModelResponse) -> Result<ExtractedResponse, AnalysisFailure> {
    let Some(text) = response.body else {
        return Err(AnalysisFailure::InvalidResponse(
            "response body is absent".to_string(),
        ));
    };

    let citations = response
        .grounding_metadata
        .unwrap_or_default()
        .into_iter()
        .filter_map(|citation| {
            let source_url = citation.source_url.trim();
            if source_url.is_empty() {
                tracing::debug!("Dropping grounding citation without source URL");
                return None;
            }
            Some(Citation {
                source_url: source_url.to_string(),
                snippet: citation.snippet.trim().to_string(),
            })
        })
        .collect();

    Ok(ExtractedResponse { text, citations })
}
