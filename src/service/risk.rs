//! Risk tier derivation
//!
//! Classification is the primary signal; the score only refines the two
//! hedged classifications. Within one classification a lower score never
//! yields a lower risk tier.

use crate::model::{AnalysisResult, Classification, ParsedAnalysis, RiskLevel};

/// Score below which a `LikelyFake` verdict is treated as high risk
const LIKELY_FAKE_HIGH_RISK_BELOW: u8 = 30;

/// Score at or above which a `LikelyAuthentic` verdict is treated as low risk
const LIKELY_AUTHENTIC_LOW_RISK_FROM: u8 = 70;

/// Derive the risk tier for a classification and score
pub fn classify_risk(classification: Classification, score: u8) -> RiskLevel {
    match classification {
        Classification::Fake => RiskLevel::Critical,
        Classification::LikelyFake => {
            if score < LIKELY_FAKE_HIGH_RISK_BELOW {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            }
        }
        Classification::Uncertain => RiskLevel::Medium,
        Classification::LikelyAuthentic => {
            if score >= LIKELY_AUTHENTIC_LOW_RISK_FROM {
                RiskLevel::Low
            } else {
                RiskLevel::Medium
            }
        }
        Classification::Authentic => RiskLevel::Low,
    }
}

/// Attach the derived risk tier to a parsed analysis
pub fn annotate(analysis: ParsedAnalysis) -> AnalysisResult {
    let risk_level = classify_risk(analysis.classification, analysis.score);
    AnalysisResult {
        analysis,
        risk_level,
    }
}
