use serde::Serialize;

use crate::db::Table;
use crate::models::{
    AppointmentRequest, BookingPrompt, BookingStep, CallRecord, Entities, IntentCategory,
    IntentResult, PracticeProfile,
};
use crate::services::practice::resolve_practice;
use crate::state::AppState;

const MAX_RESPONSE_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct SpokenResponse {
    pub text: String,
    pub should_speak: bool,
    pub end_call: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalate: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticeInfo {
    pub identified: bool,
    pub name: Option<String>,
    pub practice_id: Option<String>,
}

impl PracticeInfo {
    fn from_profile(profile: Option<&PracticeProfile>) -> Self {
        Self {
            identified: profile.is_some(),
            name: profile.map(|p| p.name.clone()),
            practice_id: profile.map(|p| p.practice_id.clone()),
        }
    }
}

/// Everything one turn produced: the classification, what to say, and which
/// practice it was for.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub intent_analysis: IntentResult,
    pub response: SpokenResponse,
    pub practice_info: PracticeInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingPrompt>,
}

impl AnalysisOutcome {
    fn from_intent(result: IntentResult, profile: Option<&PracticeProfile>) -> Self {
        let response = SpokenResponse {
            text: result.suggested_response.clone(),
            should_speak: true,
            end_call: false,
            priority: (result.intent == IntentCategory::Emergency).then_some("urgent"),
            escalate: (result.intent == IntentCategory::Unknown).then_some(true),
        };
        Self {
            intent_analysis: result,
            response,
            practice_info: PracticeInfo::from_profile(profile),
            booking: None,
        }
    }

    fn from_booking(prompt: BookingPrompt, profile: Option<&PracticeProfile>) -> Self {
        let intent_analysis = IntentResult {
            intent: IntentCategory::AppointmentBooking,
            confidence: 1.0,
            matched_keywords: vec![],
            extracted_entities: Entities::default(),
            suggested_response: prompt.question.clone(),
            tenant_specific: false,
            faq_matched: None,
        };
        let mut outcome = Self::from_intent(intent_analysis, profile);
        outcome.booking = Some(prompt);
        outcome
    }

    pub fn text(&self) -> &str {
        &self.response.text
    }
}

/// Stateless classification of one transcript.
pub fn analyze(state: &AppState, transcript: &str, practice_key: Option<&str>) -> AnalysisOutcome {
    let profile = resolve_practice(state.store.as_ref(), practice_key);
    let result = state.intents.analyze(transcript, profile.as_ref());
    AnalysisOutcome::from_intent(result, profile.as_ref())
}

/// Answers one caller turn. A conversation that is mid-booking is driven by
/// the booking flow; everything else goes through the intent engine, and a
/// booking intent opens a new flow. Without a conversation key no booking
/// session is opened or continued.
pub fn respond(
    state: &AppState,
    conversation: Option<&str>,
    transcript: &str,
    practice_key: Option<&str>,
) -> AnalysisOutcome {
    let profile = resolve_practice(state.store.as_ref(), practice_key);

    if let Some(call_id) = conversation {
        if let Some(prompt) = continue_booking(state, call_id, transcript, profile.as_ref()) {
            return AnalysisOutcome::from_booking(prompt, profile.as_ref());
        }
    }

    let result = state.intents.analyze(transcript, profile.as_ref());
    tracing::info!(
        conversation = ?conversation,
        intent = result.intent.as_str(),
        confidence = result.confidence,
        "analysed caller turn"
    );

    if let (IntentCategory::AppointmentBooking, Some(call_id)) = (result.intent, conversation) {
        if let Some(prompt) = start_booking(state, call_id, &result.extracted_entities) {
            let mut outcome = AnalysisOutcome::from_intent(result, profile.as_ref());
            outcome.response.text = prompt.question.clone();
            outcome.booking = Some(prompt);
            return outcome;
        }
    }

    AnalysisOutcome::from_intent(result, profile.as_ref())
}

fn continue_booking(
    state: &AppState,
    call_id: &str,
    transcript: &str,
    profile: Option<&PracticeProfile>,
) -> Option<BookingPrompt> {
    let session_id = state.session_for_call(call_id)?;
    let step = match state.bookings.current_step(&session_id) {
        Some(step) => step,
        None => {
            state.take_session(call_id);
            return None;
        }
    };
    if step.is_handed_off() {
        return None;
    }

    match state.bookings.advance(&session_id, Some(transcript)) {
        Ok(prompt) => {
            if prompt.step == BookingStep::CheckAvailability {
                hand_off(state, call_id, &session_id, profile);
            }
            Some(prompt)
        }
        Err(e) => {
            tracing::warn!(call_id, session_id = %session_id, error = %e, "booking flow rejected turn");
            None
        }
    }
}

fn start_booking(state: &AppState, call_id: &str, entities: &Entities) -> Option<BookingPrompt> {
    let session_id = state.bookings.start(call_id);
    if let Some(previous) = state.bind_session(call_id, &session_id) {
        state.bookings.end(&previous);
    }

    let date = entities.date.clone().or_else(|| entities.day.clone());
    if date.is_some() || entities.time.is_some() {
        if let Err(e) = state
            .bookings
            .set_preferred_schedule(&session_id, date, entities.time.clone())
        {
            tracing::warn!(session_id = %session_id, error = %e, "could not seed preferred schedule");
        }
    }

    match state.bookings.advance(&session_id, None) {
        Ok(prompt) => Some(prompt),
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "new booking session did not start");
            None
        }
    }
}

/// Persists the gathered details as an appointment request and deletes the
/// session; slot selection happens downstream.
fn hand_off(
    state: &AppState,
    call_id: &str,
    session_id: &str,
    profile: Option<&PracticeProfile>,
) {
    let Some(session) = state.bookings.session(session_id) else {
        state.take_session(call_id);
        return;
    };
    let request =
        AppointmentRequest::from_session(&session, profile.map(|p| p.practice_id.clone()));
    match state.store.insert(Table::Appointments, request.to_record()) {
        Ok(_) => tracing::info!(
            session_id,
            appointment_id = %request.id,
            urgency = %request.urgency,
            "appointment request recorded"
        ),
        Err(e) => tracing::error!(session_id, error = %e, "failed to record appointment request"),
    }
    if let Err(e) = state.bookings.complete(session_id) {
        tracing::warn!(session_id, error = %e, "could not complete booking session");
    }
    state.take_session(call_id);
    state.bookings.end(session_id);
}

/// Drops the call's booking session, if it has one.
pub fn finish_call(state: &AppState, call_id: &str) -> bool {
    match state.take_session(call_id) {
        Some(session_id) => state.bookings.end(&session_id),
        None => false,
    }
}

fn truncate_response(text: &str) -> String {
    if text.chars().count() <= MAX_RESPONSE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_RESPONSE_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Logs the call turn. Failures are reported, never raised.
pub fn record_call(state: &AppState, mut record: CallRecord) -> bool {
    record.response_text = truncate_response(&record.response_text);
    match state.store.insert(Table::Calls, record.to_record()) {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(call_id = %record.call_id, error = %e, "failed to record call");
            false
        }
    }
}
