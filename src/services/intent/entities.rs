use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Entities, IntentCategory};

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}(?::\d{2})?\s*(?:am|pm|a\.m\.|p\.m\.))").expect("time pattern")
});
static DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tomorrow)")
        .expect("day pattern")
});
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d{1,2}(?:st|nd|rd|th)?\s+(?:january|february|march|april|may|june|july|august|september|october|november|december))",
    )
    .expect("date pattern")
});
static INSURANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(delta\s+dental|delta|aetna|cigna|blue\s+cross|humana|metlife|united|anthem)")
        .expect("insurance pattern")
});
static SERVICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(cleaning|whitening|filling|crown|root\s+canal|extraction|braces|implants)")
        .expect("service pattern")
});
static PAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(severe|terrible|unbearable|mild|moderate|intense)").expect("pain pattern")
});

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Scans normalised text for scheduling details plus the extra entity that
/// belongs to the chosen intent. First match wins for every key.
pub fn extract(text: &str, intent: IntentCategory) -> Entities {
    let mut entities = Entities {
        time: first_capture(&TIME, text),
        day: first_capture(&DAY, text),
        date: first_capture(&DATE, text),
        ..Default::default()
    };

    match intent {
        IntentCategory::InsuranceInquiry => {
            entities.insurance_provider = first_capture(&INSURANCE, text);
        }
        IntentCategory::ServicesInquiry => {
            entities.service_type = first_capture(&SERVICE, text);
        }
        IntentCategory::Emergency => {
            entities.pain_level = first_capture(&PAIN, text);
        }
        _ => {}
    }

    entities
}
