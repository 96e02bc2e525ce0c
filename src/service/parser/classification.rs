//! Keyword matching for verdict labels and cross-modal consistency tags

use crate::model::{Classification, ConfidenceLevel, Consistency};

const FAKE_WORDS: &[&str] = &[
    "fake",
    "fabricated",
    "false",
    "hoax",
    "manipulated",
    "inauthentic",
];
const MISLEADING_WORDS: &[&str] = &["misleading", "suspicious", "questionable", "dubious"];
const UNCERTAIN_WORDS: &[&str] = &[
    "uncertain",
    "unverified",
    "inconclusive",
    "undetermined",
    "unclear",
    "unknown",
    "mixed",
];
const AUTHENTIC_WORDS: &[&str] = &["authentic", "genuine", "real", "credible", "legitimate", "true"];
/// Confirmation words: authentic on their own, uncertain when negated
const CONFIRMED_WORDS: &[&str] = &["verified", "confirmed"];
const HEDGE_WORDS: &[&str] = &["likely", "probably", "possibly", "mostly"];
const NEGATIONS: &[&str] = &["not", "no", "non", "never"];

/// How many tokens back a negation still applies (`could not be verified`)
const NEGATION_WINDOW: usize = 2;

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn has_any(tokens: &[String], words: &[&str]) -> bool {
    tokens.iter().any(|t| words.contains(&t.as_str()))
}

fn is_negated(tokens: &[String], index: usize) -> bool {
    tokens[index.saturating_sub(NEGATION_WINDOW)..index]
        .iter()
        .any(|t| NEGATIONS.contains(&t.as_str()))
}

/// Which side of the verdict scale a word points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Fake,
    Authentic,
}

fn polar_verdict(polarity: Polarity, hedged: bool, negated: bool) -> Classification {
    match (polarity, negated) {
        (Polarity::Fake, false) if hedged => Classification::LikelyFake,
        (Polarity::Fake, false) => Classification::Fake,
        (Polarity::Fake, true) => Classification::LikelyAuthentic,
        (Polarity::Authentic, false) if hedged => Classification::LikelyAuthentic,
        (Polarity::Authentic, false) => Classification::Authentic,
        (Polarity::Authentic, true) if hedged => Classification::LikelyFake,
        (Polarity::Authentic, true) => Classification::Fake,
    }
}

/// The earliest verdict label from the closed set (`Likely Fake`, `Authentic`, ...)
fn stated_label(tokens: &[String]) -> Option<Classification> {
    tokens.iter().enumerate().find_map(|(i, token)| {
        let (polarity, forced_hedge) = match token.as_str() {
            "uncertain" => return Some(Classification::Uncertain),
            "fake" => (Polarity::Fake, false),
            "suspicious" => (Polarity::Fake, true),
            "authentic" => (Polarity::Authentic, false),
            _ => return None,
        };
        let hedged = i > 0 && HEDGE_WORDS.contains(&tokens[i - 1].as_str());
        let start = if hedged { i - 1 } else { i };
        Some(polar_verdict(
            polarity,
            hedged || forced_hedge,
            is_negated(tokens, start),
        ))
    })
}

/// Synonym families, used when the value names no verdict label
fn synonym_verdict(tokens: &[String]) -> Option<Classification> {
    let mut fake = false;
    let mut misleading = false;
    let mut uncertain = false;
    let mut authentic = false;
    let mut hedged = false;

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_str();
        let negated = is_negated(tokens, i);

        if FAKE_WORDS.contains(&token) || MISLEADING_WORDS.contains(&token) {
            if negated {
                authentic = true;
                hedged = true;
            } else if FAKE_WORDS.contains(&token) {
                fake = true;
            } else {
                misleading = true;
            }
        } else if AUTHENTIC_WORDS.contains(&token) {
            if negated {
                fake = true;
            } else {
                authentic = true;
            }
        } else if CONFIRMED_WORDS.contains(&token) {
            if negated {
                uncertain = true;
            } else {
                authentic = true;
            }
        } else if UNCERTAIN_WORDS.contains(&token) {
            uncertain = true;
        } else if HEDGE_WORDS.contains(&token) {
            hedged = true;
        }
    }

    if fake {
        Some(polar_verdict(Polarity::Fake, hedged, false))
    } else if misleading {
        Some(Classification::LikelyFake)
    } else if uncertain {
        Some(Classification::Uncertain)
    } else if authentic {
        Some(polar_verdict(Polarity::Authentic, hedged, false))
    } else {
        None
    }
}

/// Match a classification value against the closed verdict set
///
/// A verdict label the model wrote wins, earliest first, so trailing
/// qualifiers (`Likely Authentic (some claims unverified)`) never override
/// it. Synonyms are consulted only when no label is present. A negation up
/// to two words back flips the family (`not authentic` reads as fake,
/// `not misleading` as a hedged authentic, `could not be verified` as
/// uncertain). Returns `None` when nothing matches so the caller can fall
/// back to the score band.
pub fn classify_keywords(text: &str) -> Option<Classification> {
    let tokens = tokenize(text);
    stated_label(&tokens).or_else(|| synonym_verdict(&tokens))
}

/// Read a stated confidence level (`HIGH`, `Medium`, `moderate`, ...)
pub fn confidence_level(text: &str) -> Option<ConfidenceLevel> {
    tokenize(text).iter().find_map(|token| match token.as_str() {
        "high" => Some(ConfidenceLevel::High),
        "medium" | "moderate" => Some(ConfidenceLevel::Medium),
        "low" => Some(ConfidenceLevel::Low),
        _ => None,
    })
}

/// Read a cross-modal consistency tag, or a numeric agreement score
///
/// Numbers above 1 are read as percentages. Returns `None` when the value
/// carries neither a tag nor a number.
pub fn consistency(text: &str) -> Option<Consistency> {
    let tokens = tokenize(text);
    let negated_consistent = tokens
        .windows(2)
        .any(|w| NEGATIONS.contains(&w[0].as_str()) && w[1] == "consistent");

    if negated_consistent
        || has_any(
            &tokens,
            &["inconsistent", "contradictory", "mismatch", "mismatched"],
        )
    {
        return Some(Consistency::Inconsistent);
    }
    if has_any(&tokens, &["partially", "partial", "mixed", "somewhat"]) {
        return Some(Consistency::PartiallyConsistent);
    }
    if has_any(&tokens, &["consistent", "aligned", "matches", "match"]) {
        return Some(Consistency::Consistent);
    }

    let value = super::first_number(text)?;
    let ratio = if value > 1.0 { value / 100.0 } else { value };
    Some(Consistency::Scored(ratio.clamp(0.0, 1.0)))
}
