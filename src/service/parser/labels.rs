//! Tolerant labeled-field scanner over free-form model output
//!
//! Model answers loosely follow a `LABEL: value` convention, often with
//! markdown decoration (`**Score:** 82`, `## KEY FINDINGS:`) and bullet lists
//! under each label. The scanner splits the text into sections, one per
//! recognized label, each holding the inline value and every following line
//! up to the next recognized label. Unrecognized `Word:` prefixes (URLs,
//! `Note:`) are treated as ordinary content.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Matches a label line: optional markdown/bullet/number prefix, a short label, a colon
static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s#>*\-•]*(?:\d+[.)]\s+)?\**([A-Za-z][A-Za-z0-9 _\-/]{0,58}?)\**\s*:\**\s*(.*)$")
        .expect("label regex is valid")
});

/// Leading bullet or enumeration marker on a list item
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•+]|\d+[.)])\s+").expect("bullet regex is valid"));

/// Parsed field a label maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Score,
    Classification,
    Confidence,
    Consistency,
    Evidence,
    RedFlags,
    Recommendation,
    Reasoning,
    /// Known section with no field of its own; only ends the previous section
    Other,
}

impl Field {
    /// Fields whose sections hold bulleted items
    fn is_list(self) -> bool {
        matches!(self, Field::Evidence | Field::RedFlags)
    }
}

const EVIDENCE_LABELS: &[&str] = &[
    "evidence",
    "supporting evidence",
    "evidence compilation",
    "findings",
    "key findings",
    "fact check results",
    "visual evidence",
    "technical analysis",
    "text analysis summary",
    "image analysis summary",
];

const RED_FLAG_LABELS: &[&str] = &[
    "red flags",
    "red flags detected",
    "red flags identified",
    "warning signs",
    "concerns",
];

const RECOMMENDATION_LABELS: &[&str] = &["recommendation", "final recommendation", "conclusion"];

const REASONING_LABELS: &[&str] = &[
    "reasoning",
    "reasoning chain",
    "comprehensive reasoning",
    "final assessment",
];

const OTHER_LABELS: &[&str] = &[
    "key topics",
    "key topics extracted",
    "important keywords",
    "entities detected",
    "search queries",
    "extracted text",
    "analysis priority",
    "verification steps",
    "verification strategy",
    "contextual analysis",
    "contextual verification",
    "cross modal verification",
    "manipulation detected",
    "reverse search assessment",
    "text content analysis",
    "summary",
];

/// Map a normalized label to the field it feeds
fn field_for(label: &str) -> Option<Field> {
    if label.ends_with("score") && !label.contains("confidence") {
        return Some(Field::Score);
    }
    if label.ends_with("classification") || label == "verdict" || label == "final verdict" {
        return Some(Field::Classification);
    }
    if label == "confidence" || label == "confidence level" {
        return Some(Field::Confidence);
    }
    if label.ends_with("consistency") {
        return Some(Field::Consistency);
    }

    let field = if EVIDENCE_LABELS.contains(&label) {
        Field::Evidence
    } else if RED_FLAG_LABELS.contains(&label) {
        Field::RedFlags
    } else if RECOMMENDATION_LABELS.contains(&label) {
        Field::Recommendation
    } else if REASONING_LABELS.contains(&label) {
        Field::Reasoning
    } else if OTHER_LABELS.contains(&label) {
        Field::Other
    } else {
        return None;
    };
    Some(field)
}

/// Lowercase, turn `_`/`-`/`/` into spaces, collapse whitespace
fn normalize_label(raw: &str) -> String {
    raw.replace(['_', '-', '/', '*'], " ")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Recognize a label line, returning its field, normalized label, and inline value
fn match_label(line: &str) -> Option<(Field, String, &str)> {
    let captures = LABEL_LINE.captures(line)?;
    let label = normalize_label(captures.get(1)?.as_str());
    let field = field_for(&label)?;
    let value = captures.get(2).map_or("", |m| m.as_str()).trim();
    Some((field, label, value))
}

/// Whether `line` is a bulleted or numbered list item
fn is_list_item(line: &str) -> bool {
    BULLET.is_match(line.trim_start())
}

/// One labeled section of the model output
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub field: Field,
    pub label: String,
    lines: Vec<&'a str>,
}

impl<'a> Section<'a> {
    /// Trimmed, non-empty content lines, inline value first
    pub fn lines(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.lines
            .iter()
            .copied()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }

    /// Content lines with bullet markers and stray emphasis removed
    pub fn items(&self) -> impl Iterator<Item = String> + '_ {
        self.lines()
            .map(|line| BULLET.replace(line, "").trim_matches('*').trim().to_string())
            .filter(|item| !item.is_empty())
    }

    /// All content on one line with whitespace collapsed
    pub fn joined(&self) -> String {
        self.lines()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Every recognized section of a text block, in order of appearance
#[derive(Debug, Clone, Default)]
pub struct LabeledFields<'a> {
    sections: Vec<Section<'a>>,
}

impl<'a> LabeledFields<'a> {
    /// Split a text block into labeled sections; text before the first label is ignored
    ///
    /// Inside an evidence or red-flags list, a bullet such as `- Summary: AP
    /// confirms` is an item, not a header. A bulleted label with nothing after
    /// its colon still opens a section.
    pub fn scan(text: &'a str) -> Self {
        let mut sections: Vec<Section<'a>> = Vec::new();

        for line in text.lines() {
            let in_list = sections.last().is_some_and(|s| s.field.is_list());
            let header = match_label(line)
                .filter(|(_, _, value)| !(in_list && !value.is_empty() && is_list_item(line)));

            if let Some((field, label, value)) = header {
                let mut lines = Vec::new();
                if !value.is_empty() {
                    lines.push(value);
                }
                sections.push(Section {
                    field,
                    label,
                    lines,
                });
            } else if let Some(current) = sections.last_mut() {
                current.lines.push(line);
            }
        }

        Self { sections }
    }

    /// First section feeding `field`
    pub fn first(&self, field: Field) -> Option<&Section<'a>> {
        self.sections.iter().find(|s| s.field == field)
    }

    /// Sections feeding `field`, keeping only the first occurrence of each label spelling
    pub fn distinct(&self, field: Field) -> Vec<&Section<'a>> {
        let mut seen = HashSet::new();
        self.sections
            .iter()
            .filter(|s| s.field == field && seen.insert(s.label.as_str()))
            .collect()
    }

    /// List items from every distinct section feeding `field`
    pub fn items(&self, field: Field) -> Vec<String> {
        self.distinct(field)
            .into_iter()
            .flat_map(|section| section.items().collect::<Vec<_>>())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_variants() {
        let (field, label, value) = match_label("AUTHENTICITY SCORE: 82").unwrap();
        assert_eq!(field, Field::Score);
        assert_eq!(label, "authenticity score");
        assert_eq!(value, "82");

        let (field, _, value) = match_label("**Score:** 82").unwrap();
        assert_eq!(field, Field::Score);
        assert_eq!(value, "82");

        let (field, _, value) = match_label("## Final_Classification :  LIKELY FAKE").unwrap();
        assert_eq!(field, Field::Classification);
        assert_eq!(value, "LIKELY FAKE");

        let (field, label, _) = match_label("1. RED_FLAGS_DETECTED:").unwrap();
        assert_eq!(field, Field::RedFlags);
        assert_eq!(label, "red flags detected");

        let (field, _, _) = match_label("CROSS_MODAL_CONSISTENCY: CONSISTENT").unwrap();
        assert_eq!(field, Field::Consistency);
    }

    #[test]
    fn test_unknown_prefixes_are_content() {
        assert!(match_label("Note: the photo predates the event").is_none());
        assert!(match_label("https://example.com/story").is_none());
        assert!(match_label("Confidence score: 0.9").is_none());
        assert!(match_label("plain sentence without a colon").is_none());
    }

    #[test]
    fn test_scan_collects_lines_until_next_label() {
        let text = "Preamble that is ignored\n\
                    Evidence:\n\
                    - Reuters reported the same figures\n\
                    \n\
                    Note: photo metadata matches\n\
                    Verification Steps:\n\
                    - Call the agency\n\
                    Score: 71";
        let fields = LabeledFields::scan(text);

        let evidence = fields.first(Field::Evidence).unwrap();
        assert_eq!(
            evidence.items().collect::<Vec<_>>(),
            vec![
                "Reuters reported the same figures".to_string(),
                "Note: photo metadata matches".to_string(),
            ]
        );
        assert_eq!(fields.first(Field::Score).unwrap().joined(), "71");
        assert!(fields.first(Field::RedFlags).is_none());
    }

    #[test]
    fn test_label_words_inside_lists_stay_items() {
        let text = "Evidence:\n\
                    - Summary: AP confirms\n\
                    - Reuters confirms\n\
                    Red Flags:\n\
                    1. Concerns: anonymous source\n\
                    * Conclusion: reused photo\n\
                    Recommendation: Verify before sharing";
        let fields = LabeledFields::scan(text);

        assert_eq!(
            fields.items(Field::Evidence),
            vec!["Summary: AP confirms", "Reuters confirms"]
        );
        assert_eq!(
            fields.items(Field::RedFlags),
            vec!["Concerns: anonymous source", "Conclusion: reused photo"]
        );
        assert_eq!(
            fields.first(Field::Recommendation).unwrap().joined(),
            "Verify before sharing"
        );
    }

    #[test]
    fn test_bulleted_headers_outside_lists() {
        let text = "- **Score:** 64\nEvidence:\n- a\n1. RED_FLAGS_DETECTED:\n- b";
        let fields = LabeledFields::scan(text);

        assert_eq!(fields.first(Field::Score).unwrap().joined(), "64");
        assert_eq!(fields.items(Field::Evidence), vec!["a"]);
        assert_eq!(fields.items(Field::RedFlags), vec!["b"]);
    }

    #[test]
    fn test_distinct_keeps_first_of_each_label() {
        let text = "Supporting Evidence:\n- a\nFact Check Results:\n- b\nSupporting Evidence:\n- c";
        let fields = LabeledFields::scan(text);
        assert_eq!(fields.items(Field::Evidence), vec!["a", "b"]);
    }

    #[test]
    fn test_items_strip_bullets_and_emphasis() {
        let text = "Key Findings:\n  • **Shadows inconsistent**\n  2) Cloned region near sign\n* EXIF stripped";
        let fields = LabeledFields::scan(text);
        assert_eq!(
            fields.items(Field::Evidence),
            vec![
                "Shadows inconsistent",
                "Cloned region near sign",
                "EXIF stripped"
            ]
        );
    }

    #[test]
    fn test_empty_text_has_no_sections() {
        assert!(LabeledFields::scan("").is_empty());
        assert!(LabeledFields::scan("just prose, no labels").is_empty());
    }
}
