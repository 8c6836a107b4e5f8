//! Scripted appointment-booking dialogue.
//!
//! Sessions live in one map behind a single `Mutex`; each `advance` holds the
//! lock for the whole read-modify-write, so concurrent deliveries for the
//! same session are serialised and the last writer wins. Callers that need
//! several calls to observe a consistent session (read the step, then
//! advance) must add their own per-session lock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::models::{BookingPrompt, BookingSession, BookingStep, SessionSummary, StepData, Urgency};
use crate::services::intent::is_confirmation_positive;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("booking session not found: {0}")]
    SessionNotFound(String),

    #[error("booking session is at {step}, which this flow does not drive")]
    HandedOff { step: &'static str },
}

/// Canonical service categories in match order, with the phrases that map to
/// each. The first category with any phrase contained in the input wins.
const SERVICE_SYNONYMS: &[(&str, &[&str])] = &[
    ("cleaning", &["cleaning", "hygiene", "prophylaxis", "routine cleaning"]),
    ("checkup", &["checkup", "exam", "consultation", "inspection", "evaluation"]),
    ("emergency", &["emergency", "urgent", "pain", "broken", "lost"]),
    ("filling", &["filling", "cavity", "decay", "hole in tooth"]),
    ("crown", &["crown", "cap", "restoration", "dental crown"]),
    ("root_canal", &["root canal", "endodontic", "nerve treatment"]),
    ("extraction", &["extraction", "pull tooth", "remove tooth", "take out"]),
    ("whitening", &["whitening", "bleaching", "teeth whitening", "brighten"]),
    ("braces", &["braces", "orthodontic", "straighten teeth", "alignment"]),
    ("implant", &["implant", "dental implant", "replacement tooth"]),
];

/// Formats 10-digit (or 1-prefixed 11-digit) numbers as `(AAA) BBB-CCCC`;
/// anything else is returned trimmed but otherwise untouched.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let local = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return raw.trim().to_string(),
    };
    format!("({}) {}-{}", &local[..3], &local[3..6], &local[6..])
}

pub fn normalize_service(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    SERVICE_SYNONYMS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| lowered.contains(p)))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

fn confirmation_question(session: &BookingSession) -> String {
    format!(
        "Let me confirm your details:\n\
         • Name: {}\n\
         • Phone: {}\n\
         • Service: {}\n\n\
         Is this correct? Please say 'yes' to confirm or 'no' if you need to change anything.",
        session.customer_name.as_deref().unwrap_or_default(),
        session.customer_phone.as_deref().unwrap_or_default(),
        session.service_type.as_deref().unwrap_or_default(),
    )
}

fn ask(session: &BookingSession, question: impl Into<String>, description: &str) -> BookingPrompt {
    BookingPrompt {
        question: question.into(),
        step: session.current_step,
        session_id: session.session_id.clone(),
        requires_response: true,
        step_description: description.to_string(),
        data: None,
    }
}

#[derive(Default)]
pub struct BookingFlowManager {
    sessions: Mutex<HashMap<String, BookingSession>>,
}

impl BookingFlowManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, BookingSession>> {
        // A panic mid-update leaves at worst one stale session; keep serving.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start(&self, call_id: &str) -> String {
        let session_id = format!("booking_{call_id}_{}", Utc::now().timestamp_millis());
        let session = BookingSession::new(session_id.clone(), call_id.to_string());
        self.sessions().insert(session_id.clone(), session);
        tracing::info!(session_id = %session_id, call_id, "started booking session");
        session_id
    }

    /// Applies the caller's reply to the current step and returns the next
    /// question.
    pub fn advance(
        &self,
        session_id: &str,
        response: Option<&str>,
    ) -> Result<BookingPrompt, BookingError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| BookingError::SessionNotFound(session_id.to_string()))?;

        if session.current_step.is_handed_off() {
            return Err(BookingError::HandedOff {
                step: session.current_step.as_str(),
            });
        }

        let response = response.map(str::trim).filter(|r| !r.is_empty());
        if let Some(reply) = response {
            record_reply(session, reply);
        }
        session.touch();

        let prompt = match session.current_step {
            BookingStep::InitialIntent => {
                session.current_step = BookingStep::GatherName;
                ask(
                    session,
                    "Great! I'd be happy to help you schedule an appointment. What's your name?",
                    "Gathering customer name",
                )
            }
            BookingStep::GatherName => match session.customer_name.clone() {
                None => ask(
                    session,
                    "I didn't catch your name. Could you please tell me your full name?",
                    "Gathering customer name",
                ),
                Some(name) => {
                    session.current_step = BookingStep::GatherPhone;
                    ask(
                        session,
                        format!("Thank you, {name}. What's the best phone number to reach you?"),
                        "Gathering phone number",
                    )
                }
            },
            BookingStep::GatherPhone => {
                if session.customer_phone.is_none() {
                    ask(
                        session,
                        "I didn't get your phone number. Could you please repeat it?",
                        "Gathering phone number",
                    )
                } else {
                    session.current_step = BookingStep::GatherService;
                    ask(
                        session,
                        "What type of appointment do you need? For example: cleaning, checkup, consultation, or something specific?",
                        "Gathering service type",
                    )
                }
            }
            BookingStep::GatherService => {
                if session.service_type.is_none() {
                    ask(
                        session,
                        "I didn't catch what service you need. Could you please tell me again?",
                        "Gathering service type",
                    )
                } else {
                    session.current_step = BookingStep::ConfirmDetails;
                    let mut prompt =
                        ask(session, confirmation_question(session), "Confirming details");
                    prompt.data = Some(StepData::Confirmation {
                        name: session.customer_name.clone().unwrap_or_default(),
                        phone: session.customer_phone.clone().unwrap_or_default(),
                        service: session.service_type.clone().unwrap_or_default(),
                    });
                    prompt
                }
            }
            BookingStep::ConfirmDetails => {
                confirm_or_correct(session, response.unwrap_or_default())
            }
            step => {
                return Err(BookingError::HandedOff {
                    step: step.as_str(),
                })
            }
        };

        tracing::debug!(
            session_id,
            step = prompt.step.as_str(),
            "booking flow advanced"
        );
        Ok(prompt)
    }

    /// Records a day/date and time the caller mentioned before the flow began.
    pub fn set_preferred_schedule(
        &self,
        session_id: &str,
        date: Option<String>,
        time: Option<String>,
    ) -> Result<(), BookingError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| BookingError::SessionNotFound(session_id.to_string()))?;
        if date.is_some() {
            session.preferred_date = date;
        }
        if time.is_some() {
            session.preferred_time = time;
        }
        session.touch();
        Ok(())
    }

    /// Marks a session finished once the slot-lookup side is done with it.
    pub fn complete(&self, session_id: &str) -> Result<(), BookingError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| BookingError::SessionNotFound(session_id.to_string()))?;
        session.current_step = BookingStep::Completed;
        session.touch();
        Ok(())
    }

    pub fn current_step(&self, session_id: &str) -> Option<BookingStep> {
        self.sessions().get(session_id).map(|s| s.current_step)
    }

    pub fn session(&self, session_id: &str) -> Option<BookingSession> {
        self.sessions().get(session_id).cloned()
    }

    pub fn summary(&self, session_id: &str) -> Option<SessionSummary> {
        self.sessions().get(session_id).map(BookingSession::summary)
    }

    pub fn end(&self, session_id: &str) -> bool {
        let removed = self.sessions().remove(session_id).is_some();
        if removed {
            tracing::info!(session_id, "ended booking session");
        }
        removed
    }

    pub fn active_count(&self) -> usize {
        self.sessions().len()
    }
}

/// Writes the reply into the one field owned by the current step.
fn record_reply(session: &mut BookingSession, reply: &str) {
    match session.current_step {
        BookingStep::GatherName => session.customer_name = Some(reply.to_string()),
        BookingStep::GatherPhone => session.customer_phone = Some(normalize_phone(reply)),
        BookingStep::GatherService => {
            let service = normalize_service(reply);
            if service == "emergency" {
                session.urgency = Urgency::Urgent;
            }
            session.service_type = Some(service);
        }
        _ => {}
    }
}

fn confirm_or_correct(session: &mut BookingSession, reply: &str) -> BookingPrompt {
    if is_confirmation_positive(reply) {
        session.current_step = BookingStep::CheckAvailability;
        return BookingPrompt {
            question: "Perfect! Let me check our available appointment times...".to_string(),
            step: session.current_step,
            session_id: session.session_id.clone(),
            requires_response: false,
            step_description: "Checking availability".to_string(),
            data: Some(StepData::NextAction {
                action: BookingStep::CheckAvailability,
            }),
        };
    }

    let lowered = reply.to_lowercase();
    if lowered.contains("name") {
        session.current_step = BookingStep::GatherName;
        ask(session, "What would you like to change your name to?", "Updating customer name")
    } else if lowered.contains("phone") || lowered.contains("number") {
        session.current_step = BookingStep::GatherPhone;
        ask(session, "What's the correct phone number?", "Updating phone number")
    } else if lowered.contains("service") || lowered.contains("appointment") {
        session.current_step = BookingStep::GatherService;
        ask(session, "What type of appointment do you need?", "Updating service type")
    } else {
        ask(
            session,
            "I'm not sure what you'd like to change. Could you please specify: name, phone, or service?",
            "Clarifying changes",
        )
    }
}
