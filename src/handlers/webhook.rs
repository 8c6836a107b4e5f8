use std::sync::Arc;

use axum::extract::State;
use chrono::Datelike;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::webhook::{EVENT_END_OF_CALL, EVENT_FUNCTION_CALL};
use crate::models::{AppointmentSubmission, CallEvent, CallRecord, CallStatus};
use crate::services::appointments;
use crate::services::calls::{self, AnalysisOutcome};
use crate::state::AppState;

fn check_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get("x-vapi-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided != expected {
        tracing::warn!("webhook secret missing or wrong");
        return Err(AppError::Forbidden("invalid webhook secret".to_string()));
    }
    Ok(())
}

fn call_record(
    event: &CallEvent,
    caller: &str,
    status: CallStatus,
    outcome: &AnalysisOutcome,
) -> CallRecord {
    CallRecord {
        call_id: event.call_id_or_unknown().to_string(),
        tenant_id: outcome.practice_info.practice_id.clone(),
        caller_number: caller.to_string(),
        status,
        transcript: event.transcript.clone(),
        intent: outcome.intent_analysis.intent,
        intent_confidence: outcome.intent_analysis.confidence,
        faq_matched: outcome.intent_analysis.faq_matched.clone(),
        response_text: outcome.text().to_string(),
    }
}

// POST /vapi/incoming_call
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    check_secret(&headers, state.config.webhook_secret())?;

    if !payload.is_object() {
        return Err(AppError::BadRequest("invalid payload format".to_string()));
    }

    let event = CallEvent::from_payload(&payload);
    let call_id = event.call_id_or_unknown().to_string();
    let caller = event.caller_number.clone().filter(|c| !c.trim().is_empty());
    let has_transcript = !event.transcript.trim().is_empty();

    tracing::info!(
        call_id = %call_id,
        event_type = %event.event_type,
        has_caller = caller.is_some(),
        has_transcript,
        "voice webhook received"
    );

    match event.event_type.as_str() {
        EVENT_END_OF_CALL => {
            let caller = caller.ok_or_else(|| {
                tracing::error!(call_id = %call_id, "end-of-call report without caller number");
                AppError::BadRequest("missing caller information".to_string())
            })?;
            if !has_transcript {
                tracing::warn!(call_id = %call_id, "no transcript for completed call");
            }

            let outcome =
                calls::analyze(&state, &event.transcript, event.practice_key.as_deref());
            calls::record_call(
                &state,
                call_record(&event, &caller, CallStatus::Completed, &outcome),
            );
            if let Some(conversation) = event.conversation_key() {
                calls::finish_call(&state, &conversation);
            }
            tracing::info!(
                call_id = %call_id,
                duration_seconds = ?event.duration_seconds,
                ended_reason = ?event.ended_reason,
                "call completed"
            );
        }
        EVENT_FUNCTION_CALL => {
            if !has_transcript {
                tracing::error!(call_id = %call_id, "function call without query");
                return Err(AppError::BadRequest(
                    "invalid function call data: missing query".to_string(),
                ));
            }

            let conversation = event.conversation_key();
            let outcome = calls::respond(
                &state,
                conversation.as_deref(),
                &event.transcript,
                event.practice_key.as_deref(),
            );
            let caller = caller.as_deref().unwrap_or("function_call");
            calls::record_call(
                &state,
                call_record(&event, caller, CallStatus::InProgress, &outcome),
            );

            return Ok(Json(json!({
                "results": [{
                    "toolCallId": event.tool_call_id,
                    "result": outcome.text().replace('\n', " "),
                }]
            })));
        }
        _ if event.is_intermediate() => {
            tracing::debug!(event_type = %event.event_type, "skipping intermediate event");
        }
        _ => match caller.as_deref() {
            Some(caller) if has_transcript => {
                let outcome =
                    calls::analyze(&state, &event.transcript, event.practice_key.as_deref());
                calls::record_call(
                    &state,
                    call_record(&event, caller, CallStatus::InProgress, &outcome),
                );
            }
            _ => {
                tracing::warn!(event_type = %event.event_type, "event without caller or transcript, skipping");
            }
        },
    }

    let processed = event.event_type == EVENT_END_OF_CALL && has_transcript;
    Ok(Json(json!({
        "status": "logged",
        "call_id": call_id,
        "event_type": event.event_type,
        "processed": processed,
    })))
}

// POST /vapi/appointment_store
pub async fn appointment_store(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    check_secret(&headers, state.config.webhook_secret())?;

    if !payload.is_object() {
        return Err(AppError::BadRequest("invalid payload format".to_string()));
    }

    let submission = AppointmentSubmission::from_payload(&payload);
    let missing = submission.missing_fields();
    if !missing.is_empty() {
        let detail = format!("Missing required fields: {}", missing.join(", "));
        tracing::error!(missing = ?missing, "appointment submission rejected");
        return Err(AppError::BadRequest(detail));
    }

    let scheduled_at = submission
        .scheduled_at(chrono::Utc::now().year())
        .map_err(|e| {
            tracing::error!(error = %e, "appointment submission has an unreadable date");
            AppError::BadRequest(format!("Invalid appointment date/time format: {e}"))
        })?;

    match appointments::store_appointment(&state, &submission, scheduled_at) {
        Ok(stored) => Ok(Json(json!({
            "success": true,
            "message": format!("Appointment stored successfully. Appointment ID: {}", stored.id),
            "appointment_id": stored.id,
            "patient_name": submission.patient_name,
            "appointment_date": submission.appointment_date,
            "appointment_time": submission.appointment_time,
        }))),
        Err(e) => {
            tracing::error!(error = %e, "failed to store appointment");
            Ok(Json(json!({
                "success": false,
                "message": "Failed to store appointment in database",
            })))
        }
    }
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub transcript: Option<String>,
    pub tenant_id: Option<String>,
}

// POST /vapi/analyze_intent
pub async fn analyze_intent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Value>, AppError> {
    let transcript = req
        .transcript
        .ok_or_else(|| AppError::BadRequest("missing required field: transcript".to_string()))?;
    if transcript.trim().is_empty() {
        return Err(AppError::BadRequest("transcript cannot be empty".to_string()));
    }

    let outcome = calls::analyze(&state, &transcript, req.tenant_id.as_deref());

    Ok(Json(json!({
        "status": "analyzed",
        "transcript_length": transcript.chars().count(),
        "intent_analysis": outcome.intent_analysis,
        "response": outcome.response,
        "practice_info": outcome.practice_info,
    })))
}
