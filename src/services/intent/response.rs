use crate::models::{DayHours, Entities, IntentCategory, PracticeProfile};

use super::rules;

pub const EMPTY_TRANSCRIPT_REPLY: &str =
    "I didn't catch that. Could you please repeat your question?";
const UNKNOWN_REPLY: &str =
    "I'm not sure I understand. Could you please tell me how I can help you today?";
const FALLBACK_REPLY: &str = "I can help you with that.";

/// Builds the spoken reply for a generic intent: canned template, then
/// practice personalisation, then entity clauses.
pub fn generate(
    intent: IntentCategory,
    entities: &Entities,
    profile: Option<&PracticeProfile>,
) -> String {
    if intent == IntentCategory::Unknown {
        return unknown_response(profile);
    }

    let base = rules::canned_response(intent).unwrap_or(FALLBACK_REPLY);
    let mut response = profile
        .and_then(|p| personalize(intent, p))
        .unwrap_or_else(|| base.to_string());

    if !entities.is_empty() {
        append_entity_clauses(&mut response, entities);
    }
    response
}

fn unknown_response(profile: Option<&PracticeProfile>) -> String {
    let Some(profile) = profile else {
        return format!(
            "{UNKNOWN_REPLY} I can assist with appointments, insurance questions, office hours, or other inquiries."
        );
    };

    let services = if profile.services.is_empty() {
        "appointments, insurance questions, office hours, and other inquiries".to_string()
    } else {
        let top: Vec<&str> = profile.services.iter().take(3).map(String::as_str).collect();
        format!("appointments, {}, and other inquiries", top.join(", "))
    };
    format!("{UNKNOWN_REPLY} I can assist with {services}.")
}

fn personalize(intent: IntentCategory, profile: &PracticeProfile) -> Option<String> {
    match intent {
        IntentCategory::HoursInquiry if !profile.hours.is_empty() => Some(format!(
            "Our office hours are {}. Is there a specific day you'd like to visit?",
            format_hours(&profile.hours)
        )),
        IntentCategory::InsuranceInquiry if !profile.insurances.is_empty() => Some(format!(
            "We accept {} insurance plans. What insurance do you have?",
            join_with_and(&profile.insurances)
        )),
        IntentCategory::ServicesInquiry if !profile.services.is_empty() => Some(format!(
            "We offer {}. What specific treatment are you interested in?",
            join_with_and(&profile.services)
        )),
        IntentCategory::LocationInquiry => profile
            .location
            .as_ref()
            .filter(|location| !location.is_empty())
            .map(|location| {
                let address = location
                    .address
                    .as_deref()
                    .unwrap_or("our convenient location");
                format!("We're located at {address}. Would you like detailed directions?")
            }),
        _ => None,
    }
}

fn day_name(abbr: &str) -> Option<&'static str> {
    match abbr {
        "mon" => Some("Monday"),
        "tue" => Some("Tuesday"),
        "wed" => Some("Wednesday"),
        "thu" => Some("Thursday"),
        "fri" => Some("Friday"),
        "sat" => Some("Saturday"),
        "sun" => Some("Sunday"),
        _ => None,
    }
}

/// "Monday 9-5, Friday 9-3" using each day's first range, in stored order.
pub fn format_hours(hours: &[DayHours]) -> String {
    let formatted: Vec<String> = hours
        .iter()
        .filter_map(|h| {
            let name = day_name(&h.day)?;
            let range = h.ranges.first()?;
            Some(format!("{name} {range}"))
        })
        .collect();

    if formatted.is_empty() {
        "available upon request".to_string()
    } else {
        formatted.join(", ")
    }
}

/// "a and b" for two items, "a, b, and c" for more.
pub fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

fn append_entity_clauses(response: &mut String, entities: &Entities) {
    if let Some(day) = &entities.day {
        let lower = day.to_lowercase();
        let shown = if lower == "today" || lower == "tomorrow" {
            lower
        } else {
            title_case(day)
        };
        response.push_str(&format!(" For {shown}, let me check our availability."));
    }

    if let Some(provider) = &entities.insurance_provider {
        response.push_str(&format!(" I see you have {} insurance.", title_case(provider)));
    }

    if let Some(service) = &entities.service_type {
        response.push_str(&format!(
            " You're asking about {} services.",
            service.replace('_', " ")
        ));
    }

    if let Some(pain) = &entities.pain_level {
        response.push_str(&format!(" I understand you're experiencing {pain} pain."));
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
