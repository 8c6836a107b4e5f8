//! Keyword/pattern intent classification with practice FAQ matching.
//!
//! `IntentEngine::analyze` never fails: empty input yields `Unknown` with a
//! clarifying prompt, and practice data only ever refines a generic reply.

pub mod entities;
pub mod response;
pub mod rules;
pub mod similarity;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Entities, IntentCategory, IntentResult, PracticeProfile};

pub const DEFAULT_FAQ_THRESHOLD: f64 = 0.7;

const POSITIVE_CONFIRMATIONS: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "correct",
    "right",
    "that's right",
    "sounds good",
];

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bu\b", "you"),
        (r"\bur\b", "your"),
        (r"\bhrs?\b", "hours"),
        (r"\bappt\b", "appointment"),
        (r"\bdentist\b", "dental"),
        (r"\bdoc\b", "doctor"),
    ]
    .into_iter()
    .map(|(p, r)| (Regex::new(p).expect("abbreviation pattern"), r))
    .collect()
});

/// Lower-cases, replaces punctuation with spaces, expands abbreviations and
/// collapses whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let mut normalized = PUNCTUATION.replace_all(&lowered, " ").into_owned();
    for (pattern, replacement) in ABBREVIATIONS.iter() {
        normalized = pattern.replace_all(&normalized, *replacement).into_owned();
    }
    WHITESPACE.replace_all(&normalized, " ").trim().to_string()
}

/// Substring check against the fixed set of affirmative phrases.
pub fn is_confirmation_positive(utterance: &str) -> bool {
    let lowered = utterance.to_lowercase();
    POSITIVE_CONFIRMATIONS.iter().any(|p| lowered.contains(p))
}

#[derive(Debug, Clone)]
pub struct IntentEngine {
    faq_threshold: f64,
}

impl Default for IntentEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FAQ_THRESHOLD)
    }
}

impl IntentEngine {
    pub fn new(faq_threshold: f64) -> Self {
        let faq_threshold = if faq_threshold.is_nan() {
            DEFAULT_FAQ_THRESHOLD
        } else {
            faq_threshold.clamp(0.0, 1.0)
        };
        Self { faq_threshold }
    }

    pub fn faq_threshold(&self) -> f64 {
        self.faq_threshold
    }

    pub fn analyze(&self, transcript: &str, profile: Option<&PracticeProfile>) -> IntentResult {
        if transcript.trim().is_empty() {
            return IntentResult {
                intent: IntentCategory::Unknown,
                confidence: 0.0,
                matched_keywords: vec![],
                extracted_entities: Entities::default(),
                suggested_response: response::EMPTY_TRANSCRIPT_REPLY.to_string(),
                tenant_specific: false,
                faq_matched: None,
            };
        }

        let normalized = normalize(transcript);

        if let Some(faq) = profile.and_then(|p| self.match_faq(&normalized, p)) {
            return faq;
        }

        let mut best = IntentCategory::Unknown;
        let mut best_confidence = 0.0;
        let mut matched_keywords = vec![];
        for rule in rules::COMPILED_RULES.iter() {
            let (confidence, keywords) = rule.score(&normalized);
            if confidence > best_confidence {
                best = rule.rule.category;
                best_confidence = confidence;
                matched_keywords = keywords;
            }
        }

        let entities = entities::extract(&normalized, best);
        let suggested_response = response::generate(best, &entities, profile);

        tracing::debug!(
            intent = best.as_str(),
            confidence = best_confidence,
            "classified transcript"
        );

        IntentResult {
            intent: best,
            confidence: best_confidence,
            matched_keywords,
            extracted_entities: entities,
            suggested_response,
            tenant_specific: false,
            faq_matched: None,
        }
    }

    /// Best practice FAQ for already-normalised text, if it clears the
    /// threshold. Earlier questions win ties.
    fn match_faq(&self, normalized: &str, profile: &PracticeProfile) -> Option<IntentResult> {
        let mut best: Option<(f64, usize)> = None;
        for (idx, faq) in profile.faqs.iter().enumerate() {
            let score = similarity::faq_similarity(normalized, &normalize(&faq.question));
            if best.map_or(score > 0.0, |(s, _)| score > s) {
                best = Some((score, idx));
            }
        }

        let (score, idx) = best?;
        if score < self.faq_threshold {
            return None;
        }

        let faq = &profile.faqs[idx];
        tracing::debug!(question = %faq.question, score, "practice FAQ matched");
        Some(IntentResult {
            intent: IntentCategory::FaqSpecific,
            confidence: score,
            matched_keywords: vec![],
            extracted_entities: Entities::default(),
            suggested_response: faq.answer.clone(),
            tenant_specific: true,
            faq_matched: Some(faq.question.clone()),
        })
    }
}
