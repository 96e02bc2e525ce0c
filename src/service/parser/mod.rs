//! Result parser: turns free-form model text into a structured verdict
//!
//! Parsing never fails. Missing or garbled fields fall back to fixed defaults:
//! - no score: score 50, classification `Uncertain` whatever the text claims
//! - no classification keyword: classification from the score band
//! - consistency only for multimodal requests, left absent when not stated

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Citation, Classification, ParsedAnalysis, RequestKind};

pub mod classification;
pub mod labels;

use classification::{classify_keywords, confidence_level, consistency};
use labels::{Field, LabeledFields, Section};

/// Score used when the text carries no readable score
pub const DEFAULT_SCORE: u8 = 50;

const MAX_RECOMMENDATION_CHARS: usize = 300;
const MAX_REASONING_CHARS: usize = 400;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number regex is valid"));

/// First integer- or decimal-looking token in `text`
fn first_number(text: &str) -> Option<f64> {
    NUMBER
        .find_iter(text)
        .find_map(|m| m.as_str().parse::<f64>().ok())
}

/// Score from a score section, clamped to 0-100
fn extract_score(section: &Section<'_>) -> Option<u8> {
    let value = first_number(&section.joined())?;
    Some(value.round().clamp(0.0, 100.0) as u8)
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        text
    } else {
        text.chars().take(max).collect()
    }
}

/// Collapsed text of the first section feeding `field`, if non-empty
fn prose(fields: &LabeledFields<'_>, field: Field, max: usize) -> Option<String> {
    fields
        .first(field)
        .map(Section::joined)
        .filter(|text| !text.is_empty())
        .map(|text| truncate_chars(text, max))
}

/// Drop citations whose source URL was already seen, keeping the first snippet
pub fn dedupe_citations(citations: Vec<Citation>) -> Vec<Citation> {
    let mut seen = HashSet::new();
    citations
        .into_iter()
        .filter(|c| seen.insert(c.source_url.clone()))
        .collect()
}

/// Parse an extracted text block into a verdict without risk annotation
pub fn parse(text: &str, citations: Vec<Citation>, kind: RequestKind) -> ParsedAnalysis {
    let fields = LabeledFields::scan(text);
    if fields.is_empty() && !text.trim().is_empty() {
        tracing::debug!(
            text_length = text.len(),
            "No recognized labels in model output, using defaults"
        );
    }

    let score = fields.first(Field::Score).and_then(extract_score);
    let keyword = fields
        .first(Field::Classification)
        .and_then(|section| classify_keywords(&section.joined()));

    let (score, classification) = match score {
        None => {
            if keyword.is_some() {
                tracing::debug!(
                    keyword = ?keyword,
                    "Classification found without a score, treating as uncertain"
                );
            }
            (DEFAULT_SCORE, Classification::Uncertain)
        }
        Some(score) => {
            let band = Classification::from_score(score);
            match keyword {
                Some(stated) => {
                    if stated != band {
                        tracing::debug!(
                            score = score,
                            stated = %stated,
                            band = %band,
                            "Stated classification disagrees with score band, keeping stated"
                        );
                    }
                    (score, stated)
                }
                None => (score, band),
            }
        }
    };

    let consistency = match kind {
        RequestKind::Multimodal => fields
            .first(Field::Consistency)
            .and_then(|section| consistency(&section.joined())),
        RequestKind::Text | RequestKind::Image => None,
    };

    ParsedAnalysis {
        score,
        classification,
        evidence: fields.items(Field::Evidence),
        consistency,
        citations: dedupe_citations(citations),
        confidence: fields
            .first(Field::Confidence)
            .and_then(|section| confidence_level(&section.joined())),
        red_flags: fields.items(Field::RedFlags),
        recommendation: prose(&fields, Field::Recommendation, MAX_RECOMMENDATION_CHARS),
        reasoning: prose(&fields, Field::Reasoning, MAX_REASONING_CHARS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfidenceLevel, Consistency};

    fn citation(url: &str, snippet: &str) -> Citation {
        Citation {
            source_url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }

    const TEXT_ANALYSIS: &str = "\
AUTHENTICITY SCORE: 22
CLASSIFICATION: FAKE
CONFIDENCE LEVEL: HIGH

KEY_TOPICS_EXTRACTED:
- Election results
- County officials

FACT_CHECK_RESULTS:
- County site shows different totals

SUPPORTING_EVIDENCE:
- AP tally contradicts the quoted numbers
- Quote does not appear in any transcript

RED_FLAGS_DETECTED:
- Anonymous source
- Emotional language

REASONING_CHAIN:
The numbers conflict with the official record.
No outlet repeats the quote.

VERIFICATION_STEPS:
- Check the county website

RECOMMENDATION: Do not share.   Wait for official results.
";

    #[test]
    fn test_parse_full_text_analysis() {
        let parsed = parse(TEXT_ANALYSIS, vec![], RequestKind::Text);

        assert_eq!(parsed.score, 22);
        assert_eq!(parsed.classification, Classification::Fake);
        assert_eq!(parsed.confidence, Some(ConfidenceLevel::High));
        assert_eq!(
            parsed.evidence,
            vec![
                "County site shows different totals",
                "AP tally contradicts the quoted numbers",
                "Quote does not appear in any transcript",
            ]
        );
        assert_eq!(parsed.red_flags, vec!["Anonymous source", "Emotional language"]);
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("The numbers conflict with the official record. No outlet repeats the quote.")
        );
        assert_eq!(
            parsed.recommendation.as_deref(),
            Some("Do not share. Wait for official results.")
        );
        assert_eq!(parsed.consistency, None);
    }

    #[test]
    fn test_score_and_stated_classification() {
        let parsed = parse(
            "Score: 82\nClassification: Likely Fake",
            vec![],
            RequestKind::Text,
        );
        assert_eq!(parsed.score, 82);
        assert_eq!(parsed.classification, Classification::LikelyFake);
    }

    #[test]
    fn test_labels_in_any_order_and_case() {
        let parsed = parse(
            "classification:   likely authentic\n   SCORE :  64",
            vec![],
            RequestKind::Text,
        );
        assert_eq!(parsed.score, 64);
        assert_eq!(parsed.classification, Classification::LikelyAuthentic);
    }

    #[test]
    fn test_empty_text_defaults() {
        let parsed = parse("", vec![], RequestKind::Text);
        assert_eq!(parsed.score, DEFAULT_SCORE);
        assert_eq!(parsed.classification, Classification::Uncertain);
        assert!(parsed.evidence.is_empty());
        assert!(parsed.red_flags.is_empty());
        assert_eq!(parsed.recommendation, None);
    }

    #[test]
    fn test_missing_score_forces_uncertain() {
        let parsed = parse("Classification: FAKE", vec![], RequestKind::Text);
        assert_eq!(parsed.score, DEFAULT_SCORE);
        assert_eq!(parsed.classification, Classification::Uncertain);

        let parsed = parse("Score: unknown\nClassification: AUTHENTIC", vec![], RequestKind::Text);
        assert_eq!(parsed.score, DEFAULT_SCORE);
        assert_eq!(parsed.classification, Classification::Uncertain);
    }

    #[test]
    fn test_score_is_clamped() {
        let parsed = parse("Score: 150", vec![], RequestKind::Text);
        assert_eq!(parsed.score, 100);
        assert_eq!(parsed.classification, Classification::Authentic);

        let parsed = parse("Score: -20", vec![], RequestKind::Text);
        assert_eq!(parsed.score, 0);
        assert_eq!(parsed.classification, Classification::Fake);
    }

    #[test]
    fn test_score_token_variants() {
        assert_eq!(parse("Score: 73/100", vec![], RequestKind::Text).score, 73);
        assert_eq!(parse("Score: 67.6", vec![], RequestKind::Text).score, 68);
        assert_eq!(parse("**Overall Authenticity Score:** 91", vec![], RequestKind::Text).score, 91);
        assert_eq!(parse("Authenticity Score:\n  45 out of 100", vec![], RequestKind::Text).score, 45);
    }

    #[test]
    fn test_classification_falls_back_to_band() {
        let parsed = parse("Score: 35", vec![], RequestKind::Text);
        assert_eq!(parsed.classification, Classification::LikelyFake);

        let parsed = parse("Score: 35\nClassification: [pending]", vec![], RequestKind::Text);
        assert_eq!(parsed.classification, Classification::LikelyFake);
    }

    #[test]
    fn test_stated_classification_wins_over_band() {
        let parsed = parse("Score: 75\nClassification: Fake", vec![], RequestKind::Text);
        assert_eq!(parsed.score, 75);
        assert_eq!(parsed.classification, Classification::Fake);
    }

    #[test]
    fn test_qualified_classification_keeps_stated_verdict() {
        let parsed = parse(
            "Score: 72\nClassification: Likely Authentic (some claims unverified)",
            vec![],
            RequestKind::Text,
        );
        assert_eq!(parsed.classification, Classification::LikelyAuthentic);

        let parsed = parse(
            "Score: 88\nClassification: Authentic - not misleading",
            vec![],
            RequestKind::Text,
        );
        assert_eq!(parsed.classification, Classification::Authentic);

        let parsed = parse(
            "Score: 45\nClassification: Could not be verified",
            vec![],
            RequestKind::Text,
        );
        assert_eq!(parsed.classification, Classification::Uncertain);
    }

    #[test]
    fn test_evidence_items_starting_with_label_words() {
        let parsed = parse(
            "Score: 70\nEvidence:\n- Summary: AP confirms\n- Reuters confirms",
            vec![],
            RequestKind::Text,
        );
        assert_eq!(
            parsed.evidence,
            vec!["Summary: AP confirms", "Reuters confirms"]
        );
    }

    #[test]
    fn test_duplicate_labels_first_wins() {
        let parsed = parse(
            "Score: 30\nClassification: Likely Fake\nScore: 90\nClassification: Authentic",
            vec![],
            RequestKind::Text,
        );
        assert_eq!(parsed.score, 30);
        assert_eq!(parsed.classification, Classification::LikelyFake);
    }

    #[test]
    fn test_consistency_only_for_multimodal() {
        let text = "OVERALL AUTHENTICITY SCORE: 58\nCROSS_MODAL_CONSISTENCY: PARTIALLY_CONSISTENT";

        let parsed = parse(text, vec![], RequestKind::Multimodal);
        assert_eq!(parsed.consistency, Some(Consistency::PartiallyConsistent));

        assert_eq!(parse(text, vec![], RequestKind::Text).consistency, None);
        assert_eq!(parse(text, vec![], RequestKind::Image).consistency, None);
    }

    #[test]
    fn test_missing_consistency_stays_absent() {
        let parsed = parse("Score: 58", vec![], RequestKind::Multimodal);
        assert_eq!(parsed.consistency, None);
    }

    #[test]
    fn test_citations_deduplicated_in_order() {
        let citations = vec![
            citation("https://a.example", "first a"),
            citation("https://b.example", "first b"),
            citation("https://a.example", "second a"),
            citation("https://c.example", "first c"),
            citation("https://b.example", "second b"),
        ];

        let parsed = parse("Score: 60", citations, RequestKind::Text);
        assert_eq!(
            parsed.citations,
            vec![
                citation("https://a.example", "first a"),
                citation("https://b.example", "first b"),
                citation("https://c.example", "first c"),
            ]
        );
    }

    #[test]
    fn test_long_prose_is_truncated() {
        let long = "word ".repeat(200);
        let parsed = parse(&format!("Recommendation: {long}"), vec![], RequestKind::Text);
        assert_eq!(
            parsed.recommendation.map(|r| r.chars().count()),
            Some(MAX_RECOMMENDATION_CHARS)
        );
    }

    #[test]
    fn test_unlabeled_prose_degrades_gracefully() {
        let parsed = parse(
            "I could not determine whether this is real.\nIt might be fake.",
            vec![],
            RequestKind::Image,
        );
        assert_eq!(parsed.score, DEFAULT_SCORE);
        assert_eq!(parsed.classification, Classification::Uncertain);
        assert!(parsed.evidence.is_empty());
    }
}
